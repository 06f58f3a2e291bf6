use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::bulk::{BulkAction, BulkOutcome};
use super::registry;
use super::{FeatureConfig, FeatureError};
use crate::database::models::{Feature, FeatureSeed};
use crate::database::store::{FeatureStore, UserStore};

/// Authoritative answer to "is feature X active for user Y".
///
/// Combines the global `features.is_enabled` flag with per-user overrides
/// from `user_features`. Core features can never be disabled or deleted
/// globally.
pub struct FeatureManager {
    features: Arc<dyn FeatureStore>,
    users: Arc<dyn UserStore>,
}

impl FeatureManager {
    pub fn new(features: Arc<dyn FeatureStore>, users: Arc<dyn UserStore>) -> Self {
        Self { features, users }
    }

    /// Upsert every registry entry by name. New rows start with
    /// `is_enabled = is_core`; existing rows keep their flag. Returns the
    /// number of rows inserted, so a second call returns 0.
    pub async fn initialize_features(&self) -> Result<usize, FeatureError> {
        let mut inserted = 0;
        for descriptor in registry::list_features() {
            let seed = FeatureSeed {
                name: descriptor.name.to_string(),
                display_name: descriptor.display_name.to_string(),
                description: descriptor.description.to_string(),
                category: descriptor.category.as_str().to_string(),
                is_core: descriptor.is_core,
                version: descriptor.version.to_string(),
            };
            if self.features.upsert_feature(&seed).await? {
                inserted += 1;
            }
        }
        info!("Feature initialization complete: {} inserted", inserted);
        Ok(inserted)
    }

    pub async fn list_features(&self) -> Result<Vec<Feature>, FeatureError> {
        Ok(self.features.list_features().await?)
    }

    pub async fn get_enabled_features(&self) -> Result<BTreeSet<String>, FeatureError> {
        let features = self.features.list_features().await?;
        Ok(features
            .into_iter()
            .filter(|f| f.is_enabled)
            .map(|f| f.name)
            .collect())
    }

    /// Global enabled set with the user's overrides applied on top.
    pub async fn get_user_enabled_features(&self, user_id: Uuid) -> Result<BTreeSet<String>, FeatureError> {
        let mut enabled = self.get_enabled_features().await?;
        for o in self.features.list_user_overrides(user_id).await? {
            if o.is_enabled {
                enabled.insert(o.feature_name);
            } else {
                enabled.remove(&o.feature_name);
            }
        }
        Ok(enabled)
    }

    /// Enable globally, or for one user when `user_id` is given.
    /// Returns false (and logs) on any failure.
    pub async fn enable_feature(&self, name: &str, user_id: Option<Uuid>) -> bool {
        self.toggle(name, user_id, true).await
    }

    /// Disable globally, or for one user when `user_id` is given.
    /// Global disables of core features are refused without mutating anything.
    pub async fn disable_feature(&self, name: &str, user_id: Option<Uuid>) -> bool {
        self.toggle(name, user_id, false).await
    }

    /// Drop a user's override so they inherit the global flag again.
    /// Returns whether an override existed.
    pub async fn clear_user_override(&self, name: &str, user_id: Uuid) -> Result<bool, FeatureError> {
        let feature = self.require_feature_by_name(name).await?;
        let removed = self.features.delete_user_override(user_id, feature.id).await?;
        debug!("Cleared override for '{}' (user {}): removed={}", name, user_id, removed);
        Ok(removed)
    }

    async fn toggle(&self, name: &str, user_id: Option<Uuid>, enabled: bool) -> bool {
        match self.set_feature(name, user_id, enabled).await {
            Ok(()) => true,
            Err(FeatureError::Store(e)) => {
                error!("Failed to set feature '{}' to {}: {}", name, enabled, e);
                false
            }
            Err(e) => {
                warn!("Refused to set feature '{}' to {}: {}", name, enabled, e);
                false
            }
        }
    }

    async fn set_feature(&self, name: &str, user_id: Option<Uuid>, enabled: bool) -> Result<(), FeatureError> {
        let feature = self.require_feature_by_name(name).await?;

        match user_id {
            None => {
                if feature.is_core && !enabled {
                    return Err(FeatureError::CoreFeatureProtected {
                        name: feature.name,
                        operation: "disabled",
                    });
                }
                self.features.set_feature_enabled(feature.id, enabled).await?;
                info!("Feature '{}' globally {}", name, if enabled { "enabled" } else { "disabled" });
            }
            Some(user_id) => {
                if self.users.find_user(user_id).await?.is_none() {
                    return Err(FeatureError::UnknownUser(user_id));
                }
                self.features.upsert_user_override(user_id, feature.id, enabled).await?;
                info!(
                    "Feature '{}' {} for user {}",
                    name,
                    if enabled { "enabled" } else { "disabled" },
                    user_id
                );
            }
        }
        Ok(())
    }

    /// Set the global flag of a row by id, refusing to disable core rows.
    pub async fn set_feature_enabled(&self, id: Uuid, enabled: bool) -> Result<Feature, FeatureError> {
        let feature = self
            .features
            .find_feature(id)
            .await?
            .ok_or(FeatureError::NotFound(id))?;

        if feature.is_core && !enabled {
            return Err(FeatureError::CoreFeatureProtected {
                name: feature.name,
                operation: "disabled",
            });
        }

        if enabled {
            let current = self.get_enabled_features().await?;
            if let Some(missing) = registry::missing_dependencies(&feature.name, &current) {
                if !missing.is_empty() {
                    return Err(FeatureError::DependenciesNotMet {
                        name: feature.name,
                        missing: missing.into_iter().map(String::from).collect(),
                    });
                }
            }
        }

        let updated = self
            .features
            .set_feature_enabled(id, enabled)
            .await?
            .ok_or(FeatureError::NotFound(id))?;
        info!("Feature '{}' set to enabled={}", updated.name, updated.is_enabled);
        Ok(updated)
    }

    /// Delete a non-core feature. Its per-user overrides go with it.
    pub async fn delete_feature(&self, id: Uuid) -> Result<(), FeatureError> {
        let feature = self
            .features
            .find_feature(id)
            .await?
            .ok_or(FeatureError::NotFound(id))?;

        if feature.is_core {
            return Err(FeatureError::CoreFeatureProtected {
                name: feature.name,
                operation: "deleted",
            });
        }

        if !self.features.delete_feature(id).await? {
            return Err(FeatureError::NotFound(id));
        }
        info!("Feature '{}' deleted", feature.name);
        Ok(())
    }

    pub async fn apply_bulk_action(&self, action: BulkAction) -> Result<BulkOutcome, FeatureError> {
        let outcome = self.features.apply_bulk_action(action).await?;
        info!(
            "Bulk action '{}' applied: {} enabled, {} disabled",
            action.as_str(),
            outcome.enabled_count,
            outcome.disabled_count
        );
        Ok(outcome)
    }

    /// Client-facing configs for every feature in `enabled`, in listing order.
    pub async fn feature_configs(&self, enabled: &BTreeSet<String>) -> Result<Vec<FeatureConfig>, FeatureError> {
        let features = self.features.list_features().await?;
        Ok(features
            .iter()
            .filter(|f| enabled.contains(&f.name))
            .map(|f| FeatureConfig::from_feature(f, true))
            .collect())
    }

    async fn require_feature_by_name(&self, name: &str) -> Result<Feature, FeatureError> {
        self.features
            .find_feature_by_name(name)
            .await?
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }
}
