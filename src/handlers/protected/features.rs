// handlers/protected/features.rs - /api/features handlers
//
// Reads are open to any session; writes require an admin session.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{parse_id, ApiJson};
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::features::registry;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggleRequest {
    pub feature_name: Option<String>,
    pub user_id: Option<Uuid>,
    pub enabled: Option<bool>,
}

/// GET /api/features?userId=<id> - Features active for a user
///
/// Without `userId`, or when a non-admin asks about someone else, the
/// global enabled set is returned. Admins may query any user.
///
/// Expected Output:
/// ```json
/// { "features": [{ "name": "dashboard", "isCore": true, "isEnabled": true, "dependencies": [] }] }
/// ```
pub async fn features_get(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FeaturesQuery>,
) -> ApiResult<Json<Value>> {
    let requested = match query.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id(raw, "user")?),
    };

    let enabled = match requested {
        Some(user_id) if user_id == auth.user_id || auth.is_admin => {
            state.features.get_user_enabled_features(user_id).await?
        }
        Some(user_id) => {
            tracing::debug!(
                "User {} asked for features of {}; serving the global set",
                auth.user_id,
                user_id
            );
            state.features.get_enabled_features().await?
        }
        None => state.features.get_enabled_features().await?,
    };

    let features = state.features.feature_configs(&enabled).await?;
    Ok(Json(json!({ "features": features })))
}

/// POST /api/features - Enable or disable a feature globally or for one user (admin)
///
/// Expected Input:
/// ```json
/// { "featureName": "expenses", "userId": "optional-uuid", "enabled": true }
/// ```
pub async fn features_post(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<FeatureToggleRequest>,
) -> ApiResult<Json<Value>> {
    auth.require_admin()?;

    let name = match body.feature_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ApiError::missing_field("featureName")),
    };
    let enabled = body.enabled.ok_or_else(|| ApiError::missing_field("enabled"))?;

    if body.user_id.is_none() && !enabled && registry::is_core_feature(&name) {
        return Err(ApiError::bad_request("Core features cannot be disabled"));
    }

    let ok = if enabled {
        state.features.enable_feature(&name, body.user_id).await
    } else {
        state.features.disable_feature(&name, body.user_id).await
    };

    if !ok {
        return Err(ApiError::internal_server_error("Failed to update feature"));
    }
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/features/:name/users/:user_id - Remove a per-user override (admin)
pub async fn override_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((name, user_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    auth.require_admin()?;
    let user_id = parse_id(&user_id, "user")?;

    let removed = state.features.clear_user_override(&name, user_id).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// GET /api/features/limits - Tier limits for the calling user
pub async fn limits_get(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let user = state
        .users
        .find(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let limits = state.settings.limits_for(&user).await?;
    Ok(Json(json!({ "limits": limits })))
}
