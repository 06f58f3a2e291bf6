use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `system_settings` table. Values are untyped strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a batch settings update.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingInput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: Option<String>,
}
