// handlers/elevated/admin/settings.rs - /api/admin/settings handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiJson;
use crate::app::AppState;
use crate::database::models::SettingInput;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SettingsUpdateRequest {
    pub settings: Option<Vec<SettingInput>>,
}

/// GET /api/admin/settings - All settings, by category then key
pub async fn settings_get(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let settings = state.settings.list().await?;
    Ok(Json(json!({ "settings": settings })))
}

/// POST /api/admin/settings - Batch upsert, last write wins
///
/// Expected Input:
/// ```json
/// { "settings": [{ "key": "max_pets_free", "value": "5", "description": null, "category": "limits" }] }
/// ```
pub async fn settings_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SettingsUpdateRequest>,
) -> ApiResult<Json<Value>> {
    let inputs = body.settings.ok_or_else(|| ApiError::missing_field("settings"))?;
    let saved = state.settings.upsert_many(&inputs).await?;
    Ok(Json(json!({ "settings": saved })))
}

/// PUT /api/admin/settings - Insert any missing default settings
pub async fn settings_seed(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let inserted = state.settings.seed_defaults().await?;
    let settings = state.settings.list().await?;
    Ok(Json(json!({ "inserted": inserted, "settings": settings })))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::testing::{send, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn unauthenticated_settings_read_is_401() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, Method::GET, "/api/admin/settings", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn regular_users_are_forbidden() {
        let app = TestApp::new().await;
        let (status, _) =
            send(&app.router, Method::GET, "/api/admin/settings", Some(&app.owner_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn seed_then_update() {
        let mut config = AppConfig::development();
        config.features.seed_settings_on_startup = false;
        let app = TestApp::with_config(config).await;

        let (status, body) =
            send(&app.router, Method::PUT, "/api/admin/settings", Some(&app.admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inserted"], 6);
        assert_eq!(body["settings"].as_array().unwrap().len(), 6);

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/admin/settings",
            Some(&app.admin_token),
            Some(json!({ "settings": [{ "key": "max_pets_free", "value": "5" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"][0]["value"], "5");

        // Seeding again keeps the admin's value
        let (_, body) =
            send(&app.router, Method::PUT, "/api/admin/settings", Some(&app.admin_token), None).await;
        assert_eq!(body["inserted"], 0);
        assert_eq!(app.state.settings.get_int("max_pets_free", 0).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn update_validation() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/admin/settings",
            Some(&app.admin_token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "settings is required");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/admin/settings",
            Some(&app.admin_token),
            Some(json!({ "settings": [{ "key": " ", "value": "1" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "key is required");
    }
}
