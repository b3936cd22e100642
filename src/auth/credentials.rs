//! Registration and password verification on top of a [`UserStore`].

use validator::Validate;

use super::password::{hash_password, verify_password};
use super::RegisterRequest;
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{NewUser, User};

/// Deliberately does not say which field collided.
pub const DUPLICATE_ACCOUNT: &str = "Username or email already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const MISSING_FIELDS: &str = "Please fill in all fields";

/// Validates the request, rejects duplicates and stores a bcrypt hash.
pub async fn register_user<S>(
    store: &S,
    request: RegisterRequest,
    bcrypt_cost: u32,
) -> Result<User, AppError>
where
    S: UserStore + ?Sized,
{
    if request.has_missing_fields() {
        return Err(AppError::BadRequest(MISSING_FIELDS.into()));
    }
    let request = RegisterRequest {
        username: request.username.trim().to_string(),
        email: request.email.trim().to_string(),
        password: request.password,
    };
    request.validate()?;

    let email = request.email.to_lowercase();
    if store.user_exists(&request.username, &email).await? {
        return Err(AppError::BadRequest(DUPLICATE_ACCOUNT.into()));
    }

    let password_hash = hash_password(&request.password, bcrypt_cost)?;
    let user = store
        .insert_user(NewUser::normalized(&request.username, &email, password_hash))
        .await?;
    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Resolves `identifier` as a username or email and checks the password.
/// Unknown users and wrong passwords produce the same error.
pub async fn verify_credentials<S>(
    store: &S,
    identifier: &str,
    password: &str,
) -> Result<User, AppError>
where
    S: UserStore + ?Sized,
{
    let invalid = || AppError::BadRequest(INVALID_CREDENTIALS.into());

    let credentials = store.find_credentials(identifier).await?.ok_or_else(invalid)?;
    if !verify_password(password, &credentials.password_hash)? {
        log::debug!("Password mismatch for user {}", credentials.user.id);
        return Err(invalid());
    }
    Ok(credentials.user)
}
