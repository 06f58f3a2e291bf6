pub mod bulk;
pub mod manager;
pub mod registry;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Feature;
use crate::database::store::StoreError;

pub use bulk::{BulkAction, BulkOutcome};
pub use manager::FeatureManager;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature not found: {0}")]
    NotFound(Uuid),

    #[error("Unknown user: {0}")]
    UnknownUser(Uuid),

    #[error("Core feature '{name}' cannot be {operation}")]
    CoreFeatureProtected { name: String, operation: &'static str },

    #[error("Feature '{name}' requires {missing:?}")]
    DependenciesNotMet { name: String, missing: Vec<String> },

    #[error("Invalid bulk action: {0}")]
    InvalidBulkAction(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Feature shape served to clients by `GET /api/features`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfig {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub is_core: bool,
    pub is_enabled: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub version: String,
}

impl FeatureConfig {
    pub fn from_feature(feature: &Feature, is_enabled: bool) -> Self {
        let dependencies = registry::resolve_feature(&feature.name)
            .map(|d| d.dependencies.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        Self {
            name: feature.name.clone(),
            display_name: feature.display_name.clone(),
            description: feature.description.clone(),
            category: feature.category.clone(),
            is_core: feature.is_core,
            is_enabled,
            dependencies,
            version: feature.version.clone(),
        }
    }
}
