//! Owner identity extractor.
//!
//! The owner comes from the `X-Owner-Id` header. Requests without the
//! header act as the configured default owner.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::AppError;
use crate::state::AppState;

pub const OWNER_HEADER: &str = "x-owner-id";

/// The identity a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub i64);

impl FromRequestParts<AppState> for OwnerId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        owner_from_parts(parts, state.config.default_owner_id).map(OwnerId)
    }
}

fn owner_from_parts(parts: &Parts, default_owner: i64) -> Result<i64, AppError> {
    let Some(value) = parts.headers.get(OWNER_HEADER) else {
        return Ok(default_owner);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::Validation("X-Owner-Id must be an integer".to_string()))
}
