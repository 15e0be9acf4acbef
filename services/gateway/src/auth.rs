use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Access level carried in the token. Customers enqueue and inspect their
/// queue; managers drive the match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

/// Any authenticated caller (bearer JWT)
pub struct AuthenticatedUser {
    pub subject: String,
    pub role: Role,
}

/// Caller with the manager role; rejects plain users with 403
pub struct Manager {
    pub subject: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid header string".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected bearer token".to_string()))
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let key = DecodingKey::from_secret(state.jwt_secret.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::default())
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
        Ok(AuthenticatedUser {
            subject: data.claims.sub,
            role: data.claims.role,
        })
    }
}

impl FromRequestParts<AppState> for Manager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if user.role != Role::Manager {
            return Err(AppError::Forbidden(
                "Manager role required".to_string(),
            ));
        }
        Ok(Manager {
            subject: user.subject,
        })
    }
}
