//! Actor identity from request headers
//!
//! Sessions are handled upstream; the gateway forwards the authenticated
//! user as `X-User-Id` and `X-User-Role`.

use axum::{extract::FromRequestParts, http::request::Parts};

use journal_core::{Actor, Role, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the acting user
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for AuthActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;
        let id = UserId::parse(id)
            .map_err(|_| ApiError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))?;

        let role = header(parts, USER_ROLE_HEADER).ok_or_else(|| {
            ApiError::Unauthorized(format!("missing {} header", USER_ROLE_HEADER))
        })?;
        let role: Role = role
            .parse()
            .map_err(|e| ApiError::Unauthorized(format!("{}", e)))?;

        Ok(AuthActor(Actor::new(id, role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
