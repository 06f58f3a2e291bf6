use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::models::{SettingInput, SubscriptionTier, SystemSetting, User};
use crate::database::store::{SettingsStore, StoreError};

pub const AI_DAILY_LIMIT_FREE: &str = "ai_daily_limit_free";
pub const AI_DAILY_LIMIT_PREMIUM: &str = "ai_daily_limit_premium";
pub const PREMIUM_PRICE_MONTHLY: &str = "premium_price_monthly";
pub const AI_ENABLED: &str = "ai_enabled";
pub const MAX_PETS_FREE: &str = "max_pets_free";
pub const MAX_PETS_PREMIUM: &str = "max_pets_premium";

/// (key, value, description, category)
pub const DEFAULT_SETTINGS: &[(&str, &str, &str, &str)] = &[
    (AI_DAILY_LIMIT_FREE, "5", "Daily AI vet questions on the free tier", "ai"),
    (AI_DAILY_LIMIT_PREMIUM, "100", "Daily AI vet questions on the premium tier", "ai"),
    (PREMIUM_PRICE_MONTHLY, "9.99", "Monthly premium subscription price", "billing"),
    (AI_ENABLED, "true", "Master switch for AI features", "ai"),
    (MAX_PETS_FREE, "3", "Pet profiles allowed on the free tier", "limits"),
    (MAX_PETS_PREMIUM, "50", "Pet profiles allowed on the premium tier", "limits"),
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Setting key must not be empty")]
    EmptyKey,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Limits a user gets from their subscription tier and the current settings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLimits {
    pub tier: SubscriptionTier,
    pub ai_enabled: bool,
    pub ai_daily_limit: i64,
    pub max_pets: i64,
}

/// Read/write access to the untyped `system_settings` table.
///
/// Values are stored as strings; the typed readers parse on read and fall
/// back to the compiled-in default when the row is missing or unparsable.
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<SystemSetting>, SettingsError> {
        Ok(self.store.list_settings().await?)
    }

    /// Batch update. Every key is validated before anything is written.
    pub async fn upsert_many(&self, inputs: &[SettingInput]) -> Result<Vec<SystemSetting>, SettingsError> {
        if inputs.iter().any(|s| s.key.trim().is_empty()) {
            return Err(SettingsError::EmptyKey);
        }

        let mut saved = Vec::with_capacity(inputs.len());
        for input in inputs {
            let normalized = SettingInput {
                key: input.key.trim().to_string(),
                ..input.clone()
            };
            saved.push(self.store.upsert_setting(&normalized).await?);
        }
        info!("Updated {} system setting(s)", saved.len());
        Ok(saved)
    }

    /// Insert the default settings that are missing. Existing values are never overwritten.
    pub async fn seed_defaults(&self) -> Result<usize, SettingsError> {
        let mut inserted = 0;
        for (key, value, description, category) in DEFAULT_SETTINGS {
            let input = SettingInput {
                key: key.to_string(),
                value: value.to_string(),
                description: Some(description.to_string()),
                category: Some(category.to_string()),
            };
            if self.store.insert_setting_if_missing(&input).await? {
                inserted += 1;
            }
        }
        info!("Seeded {} default setting(s)", inserted);
        Ok(inserted)
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.store.get_setting(key).await?.map(|s| s.value))
    }

    pub async fn get_int(&self, key: &str, default: i64) -> Result<i64, SettingsError> {
        self.get_parsed(key, default).await
    }

    pub async fn get_float(&self, key: &str, default: f64) -> Result<f64, SettingsError> {
        self.get_parsed(key, default).await
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool, SettingsError> {
        let Some(raw) = self.get_string(key).await? else {
            return Ok(default);
        };
        match parse_bool(&raw) {
            Some(value) => Ok(value),
            None => {
                warn!("Setting '{}' has non-boolean value '{}', using {}", key, raw, default);
                Ok(default)
            }
        }
    }

    async fn get_parsed<T>(&self, key: &str, default: T) -> Result<T, SettingsError>
    where
        T: FromStr + std::fmt::Display,
    {
        let Some(raw) = self.get_string(key).await? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!("Setting '{}' has unparsable value '{}', using {}", key, raw, default);
                Ok(default)
            }
        }
    }

    pub async fn limits_for(&self, user: &User) -> Result<UserLimits, SettingsError> {
        let tier = user.tier();
        let (ai_key, ai_default, pets_key, pets_default) = match tier {
            SubscriptionTier::Free => (AI_DAILY_LIMIT_FREE, 5, MAX_PETS_FREE, 3),
            SubscriptionTier::Premium => (AI_DAILY_LIMIT_PREMIUM, 100, MAX_PETS_PREMIUM, 50),
        };

        let ai_enabled = self.get_bool(AI_ENABLED, true).await?;
        let ai_daily_limit = if ai_enabled {
            self.get_int(ai_key, ai_default).await?
        } else {
            0
        };

        Ok(UserLimits {
            tier,
            ai_enabled,
            ai_daily_limit,
            max_pets: self.get_int(pets_key, pets_default).await?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
