use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use grantcraft_core::UserId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The caller of a request. Anonymous callers map to the nil UUID when the
/// server does not require authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl AuthUser {
    pub fn anonymous() -> Self {
        Self(Uuid::nil())
    }

    pub fn id(&self) -> UserId {
        self.0
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

pub fn decode_user(token: &str, key: &DecodingKey) -> Result<UserId, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, key, &validation).map_err(|e| {
        debug!("rejected token: {}", e);
        ApiError::Unauthorized("invalid token".to_string())
    })?;
    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::Unauthorized("token subject is not a user id".to_string()))
}

/// Signs an HS256 token for `user`, valid for `ttl`.
pub fn issue_token(secret: &[u8], user: UserId, ttl: Duration) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => {
                let key = state
                    .jwt_key
                    .as_deref()
                    .ok_or_else(|| ApiError::Unauthorized("token authentication is not configured".to_string()))?;
                decode_user(token, key).map(AuthUser)
            }
            None if state.settings.security.require_auth => {
                Err(ApiError::Unauthorized("missing bearer token".to_string()))
            }
            None => Ok(AuthUser::anonymous()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_decode_to_the_same_user() {
        let user = Uuid::new_v4();
        let token = issue_token(b"secret", user, Duration::minutes(5)).unwrap();
        let decoded = decode_user(&token, &DecodingKey::from_secret(b"secret")).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let user = Uuid::new_v4();
        let token = issue_token(b"secret", user, Duration::minutes(5)).unwrap();
        assert!(decode_user(&token, &DecodingKey::from_secret(b"other")).is_err());

        let expired = issue_token(b"secret", user, Duration::hours(-2)).unwrap();
        assert!(decode_user(&expired, &DecodingKey::from_secret(b"secret")).is_err());
    }
}
