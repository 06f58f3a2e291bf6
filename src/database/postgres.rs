use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{
    Feature, FeatureSeed, NewUser, SettingInput, SystemSetting, User, UserFeatureOverride, UserPatch,
};
use crate::database::store::{FeatureStore, SettingsStore, StoreError, UserStore};
use crate::features::bulk::{BulkAction, BulkOutcome};

const FEATURE_COLUMNS: &str = "id, name, display_name, description, category, is_core, is_enabled, \
                               version, created_at, updated_at";

const FEATURE_ORDER: &str = "ORDER BY is_core DESC, category ASC, display_name ASC";

const USER_COLUMNS: &str = "id, email, name, password_hash, is_admin, subscription_tier, created_at, updated_at";

/// PostgreSQL implementation of the store traits.
///
/// Every mutation is a single statement (or one transaction for bulk
/// actions); concurrent admin edits resolve as last write wins.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeatureStore for PgStore {
    async fn list_features(&self) -> Result<Vec<Feature>, StoreError> {
        let query = format!("SELECT {} FROM features {}", FEATURE_COLUMNS, FEATURE_ORDER);
        Ok(sqlx::query_as::<_, Feature>(&query).fetch_all(&self.pool).await?)
    }

    async fn find_feature(&self, id: Uuid) -> Result<Option<Feature>, StoreError> {
        let query = format!("SELECT {} FROM features WHERE id = $1", FEATURE_COLUMNS);
        Ok(sqlx::query_as::<_, Feature>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_feature_by_name(&self, name: &str) -> Result<Option<Feature>, StoreError> {
        let query = format!("SELECT {} FROM features WHERE name = $1", FEATURE_COLUMNS);
        Ok(sqlx::query_as::<_, Feature>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_feature(&self, seed: &FeatureSeed) -> Result<bool, StoreError> {
        // xmax = 0 only for freshly inserted tuples
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO features (id, name, display_name, description, category, is_core, is_enabled, version)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                is_core = EXCLUDED.is_core,
                is_enabled = features.is_enabled OR EXCLUDED.is_core,
                version = EXCLUDED.version,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&seed.name)
        .bind(&seed.display_name)
        .bind(&seed.description)
        .bind(&seed.category)
        .bind(seed.is_core)
        .bind(&seed.version)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn set_feature_enabled(&self, id: Uuid, enabled: bool) -> Result<Option<Feature>, StoreError> {
        let query = format!(
            "UPDATE features SET is_enabled = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            FEATURE_COLUMNS
        );
        match sqlx::query_as::<_, Feature>(&query)
            .bind(id)
            .bind(enabled)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_check_violation() => Err(StoreError::Conflict(
                "core features must stay enabled".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_feature(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM features WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_bulk_action(&self, action: BulkAction) -> Result<BulkOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let update = match action {
            BulkAction::EnableAllNonCore => "UPDATE features SET is_enabled = TRUE, updated_at = NOW() WHERE NOT is_enabled",
            BulkAction::DisableAllOptional => {
                "UPDATE features SET is_enabled = FALSE, updated_at = NOW() WHERE NOT is_core AND is_enabled"
            }
            BulkAction::ResetToDefaults => {
                "UPDATE features SET is_enabled = is_core, updated_at = NOW() WHERE is_enabled <> is_core"
            }
        };
        sqlx::query(update).execute(&mut *tx).await?;

        if action.clears_overrides() {
            sqlx::query("DELETE FROM user_features").execute(&mut *tx).await?;
        }

        let (enabled, disabled): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE is_enabled), COUNT(*) FILTER (WHERE NOT is_enabled) FROM features",
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BulkOutcome {
            enabled_count: enabled as u64,
            disabled_count: disabled as u64,
        })
    }

    async fn list_user_overrides(&self, user_id: Uuid) -> Result<Vec<UserFeatureOverride>, StoreError> {
        Ok(sqlx::query_as::<_, UserFeatureOverride>(
            r#"
            SELECT uf.user_id, uf.feature_id, f.name AS feature_name, uf.is_enabled
            FROM user_features uf
            JOIN features f ON f.id = uf.feature_id
            WHERE uf.user_id = $1
            ORDER BY f.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn upsert_user_override(
        &self,
        user_id: Uuid,
        feature_id: Uuid,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_features (user_id, feature_id, is_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, feature_id) DO UPDATE SET
                is_enabled = EXCLUDED.is_enabled,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(feature_id)
        .bind(enabled)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(StoreError::NotFound(
                format!("user {} or feature {}", user_id, feature_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user_override(&self, user_id: Uuid, feature_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_features WHERE user_id = $1 AND feature_id = $2")
            .bind(user_id)
            .bind(feature_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn list_settings(&self) -> Result<Vec<SystemSetting>, StoreError> {
        Ok(sqlx::query_as::<_, SystemSetting>(
            "SELECT key, value, description, category, updated_at FROM system_settings
             ORDER BY category ASC NULLS FIRST, key ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<SystemSetting>, StoreError> {
        Ok(sqlx::query_as::<_, SystemSetting>(
            "SELECT key, value, description, category, updated_at FROM system_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_setting(&self, input: &SettingInput) -> Result<SystemSetting, StoreError> {
        Ok(sqlx::query_as::<_, SystemSetting>(
            r#"
            INSERT INTO system_settings (key, value, description, category)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                description = COALESCE(EXCLUDED.description, system_settings.description),
                category = COALESCE(EXCLUDED.category, system_settings.category),
                updated_at = NOW()
            RETURNING key, value, description, category, updated_at
            "#,
        )
        .bind(&input.key)
        .bind(&input.value)
        .bind(&input.description)
        .bind(&input.category)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_setting_if_missing(&self, input: &SettingInput) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, description, category)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&input.key)
        .bind(&input.value)
        .bind(&input.description)
        .bind(&input.category)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = LOWER($1)", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let query = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query).fetch_all(&self.pool).await?)
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, is_admin, subscription_tier)
            VALUES ($1, LOWER($2), $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                password_hash = EXCLUDED.password_hash,
                is_admin = EXCLUDED.is_admin,
                subscription_tier = EXCLUDED.subscription_tier,
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .bind(user.subscription_tier.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        let query = format!(
            r#"
            UPDATE users SET
                is_admin = COALESCE($2, is_admin),
                subscription_tier = COALESCE($3, subscription_tier),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(patch.is_admin)
            .bind(patch.subscription_tier.map(|t| t.as_str()))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
