//! Identity supplied by the gateway in front of the engine.
//!
//! Authentication happens upstream; requests arrive with the resolved user id
//! and role in two headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::models::caller::{Caller, Role};
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::AuthError(format!("Missing {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, USER_ID_HEADER)?.trim())
            .map_err(|_| AppError::AuthError("Malformed user id".into()))?;
        let role: Role = header(parts, USER_ROLE_HEADER)?.parse()?;

        Ok(Caller::new(user_id, role))
    }
}
