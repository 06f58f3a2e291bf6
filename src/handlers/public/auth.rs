// handlers/public/auth.rs - POST /api/auth/login handler

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiJson;
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login - Exchange email + password for a session token
///
/// Expected Output:
/// ```json
/// { "token": "eyJhbGciOiJIUzI1NiI...", "user": { "id": "...", "isAdmin": false }, "expiresIn": 604800 }
/// ```
pub async fn session_login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let email = required(body.email, "email")?;
    let password = required(body.password, "password")?;

    let session = state.users.login(&email, &password).await?;

    Ok(Json(json!({
        "token": session.token,
        "user": session.user,
        "expiresIn": session.expires_in,
    })))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}
