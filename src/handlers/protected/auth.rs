// handlers/protected/auth.rs - GET /api/auth/whoami handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;

/// GET /api/auth/whoami - Current session user with a fresh copy of their account
pub async fn session_whoami(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .find(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(json!({
        "id": auth.user_id,
        "email": auth.email,
        "isAdmin": auth.is_admin,
        "user": user,
    })))
}

#[cfg(test)]
mod tests {
    use crate::testing::{send, TestApp};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn whoami_reflects_the_session() {
        let app = TestApp::new().await;
        let (status, body) =
            send(&app.router, Method::GET, "/api/auth/whoami", Some(&app.admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], app.admin.id.to_string());
        assert_eq!(body["isAdmin"], true);
    }

    #[tokio::test]
    async fn whoami_requires_a_session() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, Method::GET, "/api/auth/whoami", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing Authorization header");

        let (status, _) =
            send(&app.router, Method::GET, "/api/auth/whoami", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleted_users_lose_their_session() {
        let app = TestApp::new().await;
        app.state.users.delete(app.owner.id).await.unwrap();
        let (status, _) =
            send(&app.router, Method::GET, "/api/auth/whoami", Some(&app.owner_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
