use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{
    Feature, FeatureSeed, NewUser, SettingInput, SystemSetting, User, UserFeatureOverride, UserPatch,
};
use crate::features::bulk::{BulkAction, BulkOutcome};

/// Errors surfaced by the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence for the `features` and `user_features` tables.
///
/// Listing methods return rows in the global feature order (core first,
/// then category, then display name).
#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn list_features(&self) -> Result<Vec<Feature>, StoreError>;

    async fn find_feature(&self, id: Uuid) -> Result<Option<Feature>, StoreError>;

    async fn find_feature_by_name(&self, name: &str) -> Result<Option<Feature>, StoreError>;

    /// Insert the feature if no row with that name exists, otherwise refresh
    /// its metadata. `is_enabled` is kept for existing rows except that core
    /// rows are forced on. Returns true when a row was inserted.
    async fn upsert_feature(&self, seed: &FeatureSeed) -> Result<bool, StoreError>;

    /// Set the global flag. Returns None for an unknown id.
    async fn set_feature_enabled(&self, id: Uuid, enabled: bool) -> Result<Option<Feature>, StoreError>;

    /// Delete a feature and every override that references it.
    async fn delete_feature(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Apply a bulk action atomically and count the resulting states.
    async fn apply_bulk_action(&self, action: BulkAction) -> Result<BulkOutcome, StoreError>;

    async fn list_user_overrides(&self, user_id: Uuid) -> Result<Vec<UserFeatureOverride>, StoreError>;

    async fn upsert_user_override(
        &self,
        user_id: Uuid,
        feature_id: Uuid,
        enabled: bool,
    ) -> Result<(), StoreError>;

    async fn delete_user_override(&self, user_id: Uuid, feature_id: Uuid) -> Result<bool, StoreError>;
}

/// Persistence for the `system_settings` key/value table.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// All settings ordered by category then key
    async fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError>;

    async fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError>;

    /// Last write wins; description and category are only replaced when given.
    async fn upsert_setting(&self, input: &SettingInput) -> Result<SystemSetting, StoreError>;

    /// Returns true when the row was inserted, false when the key already existed.
    async fn insert_setting_if_missing(&self, input: &SettingInput) -> Result<bool, StoreError>;
}

/// Persistence for the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Insert or update by email
    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError>;

    /// Delete a user and every override owned by them.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Everything the server needs from a backend.
pub trait Store: FeatureStore + SettingsStore + UserStore {}

impl<T: FeatureStore + SettingsStore + UserStore> Store for T {}
