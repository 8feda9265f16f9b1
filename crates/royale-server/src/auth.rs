use axum::http::HeaderMap;

use crate::config::AuthFileConfig;
use crate::error::AppError;

/// The token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Whether a chat submission carries admin rights. No token means an
/// ordinary sender; a token that does not match is rejected outright.
/// Senders on the configured admin list are recognised by the match itself.
pub fn is_admin(headers: &HeaderMap, auth: &AuthFileConfig) -> Result<bool, AppError> {
    match (bearer_token(headers), auth.admin_token.as_deref()) {
        (None, _) => Ok(false),
        (Some(provided), Some(expected)) if provided == expected => Ok(true),
        (Some(_), _) => Err(AppError::Unauthorized("invalid admin token".to_string())),
    }
}
