//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The authenticated caller, inserted into request extensions by
/// `require_auth` and extracted by every protected handler.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Pulls the auth session id out of a `Cookie` header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

/// Middleware that validates the auth session cookie.
///
/// On success the resolved `AuthUser` lands in request extensions; on any
/// failure the request stops with 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .db
        .validate_auth_session(session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {e}");
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
