use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `features` table.
///
/// `is_core` rows are always enabled; the stores never persist a core row
/// with `is_enabled = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub is_core: bool,
    pub is_enabled: bool,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry metadata written by feature initialization (upsert by `name`).
#[derive(Debug, Clone)]
pub struct FeatureSeed {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub is_core: bool,
    pub version: String,
}

/// A per-user override joined with the feature name it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserFeatureOverride {
    pub user_id: Uuid,
    pub feature_id: Uuid,
    pub feature_name: String,
    pub is_enabled: bool,
}

/// Global order used by every feature listing: core first, then category,
/// then display name.
pub fn feature_order(a: &Feature, b: &Feature) -> std::cmp::Ordering {
    b.is_core
        .cmp(&a.is_core)
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.display_name.cmp(&b.display_name))
}
