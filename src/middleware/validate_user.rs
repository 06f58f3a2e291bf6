use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;

/// Middleware that checks the session user still exists and that the admin
/// flag in the token matches the database. Runs after `jwt_auth_middleware`.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before user validation"))?;

    let user = state.users.find(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!("User validation failed: user {} no longer exists", auth_user.user_id);
        ApiError::unauthorized("Session user no longer exists")
    })?;

    if user.is_admin != auth_user.is_admin {
        tracing::warn!(
            "User validation failed: token admin={} but database admin={} for {}",
            auth_user.is_admin,
            user.is_admin,
            user.id
        );
        return Err(ApiError::forbidden("Session is out of date, please log in again"));
    }

    tracing::debug!("User validation successful: {} (admin={})", user.email, user.is_admin);
    Ok(next.run(request).await)
}

/// Middleware guarding the admin router
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    auth_user.require_admin()?;
    Ok(next.run(request).await)
}
