//! Authentication middleware: admin Bearer sessions and emailed link tokens.

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tcv_core::auth::jwt::{verify_link_token, verify_session_token};
use tcv_core::auth::queries::get_admin_by_id;
use tcv_core::models::auth::{AdminRecord, LinkClaims, ROLE_ADMIN};
use tcv_core::uuid::parse_id;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// The admin behind the current request.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub AdminRecord);

/// Verified claims of the link the request was made through.
#[derive(Debug, Clone)]
pub struct VerifiedLink(pub LinkClaims);

const NO_TOKEN: &str = "Not authorized, no token";
const TOKEN_FAILED: &str = "Not authorized, token failed";
const ADMIN_NOT_FOUND: &str = "Not authorized, admin not found";
const LINK_INVALID: &str = "Link expired or invalid";

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the
/// session, checks the admin still exists and injects `AuthenticatedAdmin`.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.into()))?;

    let claims = verify_session_token(token, state.config.jwt_secret.as_bytes())
        .ok_or_else(|| AppError::Unauthorized(TOKEN_FAILED.into()))?;

    if claims.role != ROLE_ADMIN {
        debug!(role = %claims.role, "non-admin session rejected");
        return Err(AppError::Unauthorized(ADMIN_NOT_FOUND.into()));
    }
    let id = parse_id(&claims.sub).ok_or_else(|| AppError::Unauthorized(ADMIN_NOT_FOUND.into()))?;
    let admin = get_admin_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(ADMIN_NOT_FOUND.into()))?;

    request.extensions_mut().insert(AuthenticatedAdmin(admin));
    Ok(next.run(request).await)
}

/// Axum middleware: verifies the `{token}` path segment as a link token and
/// injects `VerifiedLink`.
pub async fn require_link(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = params
        .get("token")
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized(NO_TOKEN.into()))?;

    let claims = verify_link_token(token, state.config.jwt_secret.as_bytes())
        .ok_or_else(|| AppError::Unauthorized(LINK_INVALID.into()))?;

    request.extensions_mut().insert(VerifiedLink(claims));
    Ok(next.run(request).await)
}
