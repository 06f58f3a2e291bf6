use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{
    feature_order, Feature, FeatureSeed, NewUser, SettingInput, SystemSetting, User,
    UserFeatureOverride, UserPatch,
};
use crate::database::store::{FeatureStore, SettingsStore, StoreError, UserStore};
use crate::features::bulk::{BulkAction, BulkOutcome};

/// Process-local store with the same semantics as the Postgres tables.
///
/// Used by the test suite and by servers started with `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    features: HashMap<Uuid, Feature>,
    // (user_id, feature_id) -> is_enabled
    overrides: HashMap<(Uuid, Uuid), bool>,
    settings: HashMap<String, SystemSetting>,
    users: HashMap<Uuid, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn list_features(&self) -> Result<Vec<Feature>, StoreError> {
        let state = self.state.read().await;
        let mut features: Vec<Feature> = state.features.values().cloned().collect();
        features.sort_by(feature_order);
        Ok(features)
    }

    async fn find_feature(&self, id: Uuid) -> Result<Option<Feature>, StoreError> {
        Ok(self.state.read().await.features.get(&id).cloned())
    }

    async fn find_feature_by_name(&self, name: &str) -> Result<Option<Feature>, StoreError> {
        let state = self.state.read().await;
        Ok(state.features.values().find(|f| f.name == name).cloned())
    }

    async fn upsert_feature(&self, seed: &FeatureSeed) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state.features.values_mut().find(|f| f.name == seed.name) {
            existing.display_name = seed.display_name.clone();
            existing.description = seed.description.clone();
            existing.category = seed.category.clone();
            existing.is_core = seed.is_core;
            existing.is_enabled = existing.is_enabled || seed.is_core;
            existing.version = seed.version.clone();
            existing.updated_at = now;
            return Ok(false);
        }

        let feature = Feature {
            id: Uuid::new_v4(),
            name: seed.name.clone(),
            display_name: seed.display_name.clone(),
            description: seed.description.clone(),
            category: seed.category.clone(),
            is_core: seed.is_core,
            is_enabled: seed.is_core,
            version: seed.version.clone(),
            created_at: now,
            updated_at: now,
        };
        state.features.insert(feature.id, feature);
        Ok(true)
    }

    async fn set_feature_enabled(&self, id: Uuid, enabled: bool) -> Result<Option<Feature>, StoreError> {
        let mut state = self.state.write().await;
        let Some(feature) = state.features.get_mut(&id) else {
            return Ok(None);
        };
        if feature.is_core && !enabled {
            return Err(StoreError::Conflict(format!(
                "core feature '{}' must stay enabled",
                feature.name
            )));
        }
        feature.is_enabled = enabled;
        feature.updated_at = Utc::now();
        Ok(Some(feature.clone()))
    }

    async fn delete_feature(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let removed = state.features.remove(&id).is_some();
        if removed {
            state.overrides.retain(|(_, feature_id), _| *feature_id != id);
        }
        Ok(removed)
    }

    async fn apply_bulk_action(&self, action: BulkAction) -> Result<BulkOutcome, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        for feature in state.features.values_mut() {
            let target = action.target_state(feature.is_core);
            if feature.is_enabled != target {
                feature.is_enabled = target;
                feature.updated_at = now;
            }
        }
        if action.clears_overrides() {
            state.overrides.clear();
        }

        Ok(BulkOutcome::tally(state.features.values().map(|f| f.is_enabled)))
    }

    async fn list_user_overrides(&self, user_id: Uuid) -> Result<Vec<UserFeatureOverride>, StoreError> {
        let state = self.state.read().await;
        let mut overrides: Vec<UserFeatureOverride> = state
            .overrides
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .filter_map(|((uid, fid), enabled)| {
                state.features.get(fid).map(|f| UserFeatureOverride {
                    user_id: *uid,
                    feature_id: *fid,
                    feature_name: f.name.clone(),
                    is_enabled: *enabled,
                })
            })
            .collect();
        overrides.sort_by(|a, b| a.feature_name.cmp(&b.feature_name));
        Ok(overrides)
    }

    async fn upsert_user_override(
        &self,
        user_id: Uuid,
        feature_id: Uuid,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        // Mirror the foreign keys on user_features
        if !state.features.contains_key(&feature_id) {
            return Err(StoreError::NotFound(format!("feature {}", feature_id)));
        }
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        state.overrides.insert((user_id, feature_id), enabled);
        Ok(())
    }

    async fn delete_user_override(&self, user_id: Uuid, feature_id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.overrides.remove(&(user_id, feature_id)).is_some())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError> {
        let state = self.state.read().await;
        let mut settings: Vec<SystemSetting> = state.settings.values().cloned().collect();
        settings.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.key.cmp(&b.key)));
        Ok(settings)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError> {
        Ok(self.state.read().await.settings.get(key).cloned())
    }

    async fn upsert_setting(&self, input: &SettingInput) -> Result<SystemSetting, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let setting = state
            .settings
            .entry(input.key.clone())
            .and_modify(|s| {
                s.value = input.value.clone();
                if input.description.is_some() {
                    s.description = input.description.clone();
                }
                if input.category.is_some() {
                    s.category = input.category.clone();
                }
                s.updated_at = now;
            })
            .or_insert_with(|| SystemSetting {
                key: input.key.clone(),
                value: input.value.clone(),
                description: input.description.clone(),
                category: input.category.clone(),
                updated_at: now,
            });
        Ok(setting.clone())
    }

    async fn insert_setting_if_missing(&self, input: &SettingInput) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.settings.contains_key(&input.key) {
            return Ok(false);
        }
        state.settings.insert(
            input.key.clone(),
            SystemSetting {
                key: input.key.clone(),
                value: input.value.clone(),
                description: input.description.clone(),
                category: input.category.clone(),
                updated_at: Utc::now(),
            },
        );
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state
            .users
            .values_mut()
            .find(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            existing.name = user.name.clone();
            existing.password_hash = user.password_hash.clone();
            existing.is_admin = user.is_admin;
            existing.subscription_tier = user.subscription_tier.as_str().to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email.to_lowercase(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
            subscription_tier: user.subscription_tier.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(tier) = patch.subscription_tier {
            user.subscription_tier = tier.as_str().to_string();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let removed = state.users.remove(&id).is_some();
        if removed {
            state.overrides.retain(|(user_id, _), _| *user_id != id);
        }
        Ok(removed)
    }
}
