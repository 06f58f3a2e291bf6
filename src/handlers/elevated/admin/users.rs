// handlers/elevated/admin/users.rs - /api/admin/users handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::{parse_id, ApiJson};
use crate::app::AppState;
use crate::database::models::{User, UserPatch};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;

/// GET /api/admin/users - Every account, ordered by email
pub async fn users_list(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = state.users.list().await?;
    Ok(Json(json!({ "users": users })))
}

/// PATCH /api/admin/users/:id - Change admin flag and/or subscription tier
///
/// Expected Input:
/// ```json
/// { "isAdmin": true, "subscriptionTier": "premium" }
/// ```
pub async fn user_patch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, "user")?;

    if patch.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    if id == auth.user_id && patch.is_admin == Some(false) {
        return Err(ApiError::bad_request("Admins cannot revoke their own admin access"));
    }

    let user = state
        .users
        .update(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
    tracing::info!("User {} updated by admin {}", user.id, auth.user_id);
    Ok(Json(user))
}

/// DELETE /api/admin/users/:id - Remove an account and its feature overrides
pub async fn user_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "user")?;
    if id == auth.user_id {
        return Err(ApiError::bad_request("Admins cannot delete their own account"));
    }

    if !state.users.delete(id).await? {
        return Err(ApiError::not_found(format!("User {} not found", id)));
    }
    tracing::info!("User {} deleted by admin {}", id, auth.user_id);
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use crate::testing::{send, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn list_hides_password_hashes() {
        let app = TestApp::new().await;
        let (status, body) =
            send(&app.router, Method::GET, "/api/admin/users", Some(&app.admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
    }

    #[tokio::test]
    async fn promote_to_premium() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            Method::PATCH,
            &format!("/api/admin/users/{}", app.owner.id),
            Some(&app.admin_token),
            Some(json!({ "subscriptionTier": "premium" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscriptionTier"], "premium");
        assert_eq!(body["isAdmin"], false);
    }

    #[tokio::test]
    async fn patch_validation() {
        let app = TestApp::new().await;
        let uri = format!("/api/admin/users/{}", app.admin.id);

        let (status, _) =
            send(&app.router, Method::PATCH, &uri, Some(&app.admin_token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app.router,
            Method::PATCH,
            &uri,
            Some(&app.admin_token),
            Some(json!({ "isAdmin": false })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app.router,
            Method::PATCH,
            &uri,
            Some(&app.admin_token),
            Some(json!({ "subscriptionTier": "platinum" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn promoted_users_must_log_in_again() {
        let app = TestApp::new().await;
        let (status, _) = send(
            &app.router,
            Method::PATCH,
            &format!("/api/admin/users/{}", app.owner.id),
            Some(&app.admin_token),
            Some(json!({ "isAdmin": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The old token still says is_admin=false
        let (status, body) =
            send(&app.router, Method::GET, "/api/features", Some(&app.owner_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Session is out of date, please log in again");
    }

    #[tokio::test]
    async fn delete_user_and_overrides() {
        let app = TestApp::new().await;
        app.state.features.enable_feature("ai-vet", Some(app.owner.id)).await;
        let uri = format!("/api/admin/users/{}", app.owner.id);

        let (status, _) = send(&app.router, Method::DELETE, &uri, Some(&app.admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app.router, Method::DELETE, &uri, Some(&app.admin_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        use crate::database::store::FeatureStore;
        assert!(app.store.list_user_overrides(app.owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let app = TestApp::new().await;
        let (status, _) = send(
            &app.router,
            Method::DELETE,
            &format!("/api/admin/users/{}", app.admin.id),
            Some(&app.admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
