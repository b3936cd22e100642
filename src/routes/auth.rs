use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::{
    auth::{
        register_user, verify_credentials, AuthResponse, AuthenticatedUser, LoginRequest,
        RegisterRequest,
    },
    error::AppError,
    models::{User, UserProfile},
    state::AppState,
};

fn auth_response(state: &AppState, user: &User, message: &str) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        message: message.to_string(),
        token: state.tokens.issue(user)?,
        user: UserProfile::from(user),
    })
}

/// Register a new user
///
/// Creates a new account and returns a bearer token for it.
///
/// ## Responses:
/// - `201 Created`: `{message, token, user}`.
/// - `400 Bad Request`: Missing fields, failed validation, or a taken username/email.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = register_user(
        state.db.as_ref(),
        register_data.into_inner(),
        state.bcrypt_cost,
    )
    .await?;

    Ok(HttpResponse::Created().json(auth_response(
        &state,
        &user,
        "Account created successfully",
    )?))
}

/// Login user
///
/// Accepts either `username` or `email` as the identifier.
///
/// ## Responses:
/// - `200 OK`: `{message, token, user}`.
/// - `400 Bad Request`: Missing fields or invalid credentials.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let identifier = match login_data.identifier() {
        Some(identifier) if !login_data.password.is_empty() => identifier,
        _ => {
            return Err(AppError::BadRequest(
                "Please enter username and password".into(),
            ))
        }
    };

    let user = verify_credentials(state.db.as_ref(), identifier, &login_data.password).await?;
    log::info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok().json(auth_response(&state, &user, "Login successful")?))
}

/// Current user
///
/// Returns the profile of the user the bearer token belongs to.
#[get("/me", wrap = "crate::auth::AuthMiddleware")]
pub async fn me(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(json!({ "user": UserProfile::from(&user.0) }))
}
