// handlers/elevated/admin/features.rs - /api/admin/features handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{parse_id, ApiJson};
use crate::app::AppState;
use crate::database::models::Feature;
use crate::error::{ApiError, ApiResult};
use crate::features::{BulkAction, BulkOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePatchRequest {
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: Option<String>,
}

/// GET /api/admin/features - Every feature row, core first, then category, then display name
pub async fn features_list(State(state): State<AppState>) -> ApiResult<Json<Vec<Feature>>> {
    Ok(Json(state.features.list_features().await?))
}

/// PATCH /api/admin/features/:id - Set the global flag of one feature
///
/// Expected Input:
/// ```json
/// { "isEnabled": false }
/// ```
///
/// Core rows reject `isEnabled: false` with `400 {"error": "Core features cannot be disabled"}`.
pub async fn feature_patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<FeaturePatchRequest>,
) -> ApiResult<Json<Feature>> {
    let id = parse_id(&id, "feature")?;
    let enabled = body.is_enabled.ok_or_else(|| ApiError::missing_field("isEnabled"))?;

    let feature = state.features.set_feature_enabled(id, enabled).await?;
    Ok(Json(feature))
}

/// DELETE /api/admin/features/:id - Remove a non-core feature and its per-user overrides
pub async fn feature_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "feature")?;
    state.features.delete_feature(id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/admin/features/bulk - Apply a bulk action to the whole table
///
/// Expected Input:
/// ```json
/// { "action": "enable-all-non-core" | "disable-all-optional" | "reset-to-defaults" }
/// ```
///
/// Expected Output:
/// ```json
/// { "enabledCount": 8, "disabledCount": 0 }
/// ```
pub async fn features_bulk(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    let action: BulkAction = body
        .action
        .as_deref()
        .ok_or_else(|| ApiError::missing_field("action"))?
        .parse()?;

    Ok(Json(state.features.apply_bulk_action(action).await?))
}

/// POST /api/admin/features/initialize - Seed missing registry features
pub async fn features_initialize(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let inserted = state.features.initialize_features().await?;
    Ok(Json(json!({ "inserted": inserted })))
}
