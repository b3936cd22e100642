use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::User;

/// Represents the claims encoded within a bearer token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Id of the user the token was issued to.
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub username: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Why a token could not be issued or accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The signature is valid but `exp` lies in the past.
    Expired,
    /// Malformed, forged, or signed with another secret.
    Invalid,
    /// Encoding failed while issuing.
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "Login expired, please log in again"),
            TokenError::Invalid => write!(f, "Invalid login token"),
            TokenError::Signing(msg) => write!(f, "Failed to generate token: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies HS256 bearer tokens with a server-held secret.
///
/// Built once at startup from configuration and shared through `AppState`.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token binding the user's id and username.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies the signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::days(7))
    }

    fn alice() -> User {
        NewUser::normalized("alice", "alice@x.com", "hash".into())
            .into_credentials()
            .user
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = service("test_secret_for_gen_verify");
        let user = alice();

        let claims = tokens.verify(&tokens.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_token_expiration() {
        let tokens = service("test_secret_for_expiration");
        let issued = Utc::now() - Duration::days(8);
        let expired = tokens
            .encode(&Claims {
                user_id: Uuid::new_v4(),
                username: "alice".into(),
                iat: issued.timestamp(),
                exp: (issued + Duration::days(7)).timestamp(),
            })
            .unwrap();

        assert_eq!(tokens.verify(&expired), Err(TokenError::Expired));
    }

    #[test]
    fn test_invalid_token_signature() {
        let issuer = service("one_secret");
        let verifier = service("a_completely_different_secret");
        let token = issuer.issue(&alice()).unwrap();

        assert_eq!(verifier.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_malformed_token() {
        assert_eq!(
            service("secret").verify("not.a.token"),
            Err(TokenError::Invalid)
        );
        assert_eq!(service("secret").verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_and_invalid_messages_differ() {
        assert_ne!(
            TokenError::Expired.to_string(),
            TokenError::Invalid.to_string()
        );
    }
}
