//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout. Passwords
//! go through the same argon2 hasher port as entry passcodes.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::web::middleware::{session_id_from_cookies, SESSION_COOKIE};
use crate::web::state::AppState;

const SESSION_TTL_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn validate_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if !email.contains('@') || email.trim().len() < 3 {
        errors.push(FieldError::new("email", "A valid email address is required"));
    }
    if password.len() < 8 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 8 characters",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Creates a fresh auth session for `user_id` and returns the Set-Cookie
/// value carrying it.
async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

    state
        .db
        .create_auth_session(&session_id, user_id, expires_at)
        .await?;

    Ok(format!(
        "{SESSION_COOKIE}={session_id}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        Duration::days(SESSION_TTL_DAYS).num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&req.email, &req.password)?;

    let password_hash = state.passcodes.hash(&req.password)?;
    let user = state
        .db
        .create_user_with_email(req.email.trim(), &password_hash)
        .await?;

    let cookie = open_session(&state, user.user_id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: user.user_id,
            email: user.email,
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // A missing user and a wrong password produce the same 401.
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|_| invalid())?;

    if !state.passcodes.verify(&req.password, &creds.hashed_password) {
        return Err(invalid());
    }

    let cookie = open_session(&state, creds.user_id).await.map_err(|e| {
        tracing::error!("Failed to open session: {e:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create session".to_string(),
        )
    })?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: creds.user_id,
            email: creds.email,
        }),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_id = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state.db.delete_auth_session(session_id).await.map_err(|e| {
        tracing::error!("Failed to delete auth session: {e:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to logout".to_string(),
        )
    })?;

    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0");
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_validation_reports_each_bad_field() {
        let err = validate_credentials("not-an-email", "short");
        match err {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.field == "email"));
                assert!(errors.iter().any(|e| e.field == "password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        assert!(validate_credentials("a@b.example", "longenough").is_ok());
    }
}
