use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::FeatureError;

/// Admin bulk operations over the whole feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkAction {
    /// Turn on every feature
    EnableAllNonCore,
    /// Turn off every non-core feature; core rows are left alone
    DisableAllOptional,
    /// Every row back to `is_enabled = is_core`, and all per-user overrides dropped
    ResetToDefaults,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::EnableAllNonCore => "enable-all-non-core",
            BulkAction::DisableAllOptional => "disable-all-optional",
            BulkAction::ResetToDefaults => "reset-to-defaults",
        }
    }

    /// State a row ends up in after the action.
    pub fn target_state(&self, is_core: bool) -> bool {
        match self {
            BulkAction::EnableAllNonCore => true,
            // Core rows are always on, so both of these land on `is_core`
            BulkAction::DisableAllOptional | BulkAction::ResetToDefaults => is_core,
        }
    }

    pub fn clears_overrides(&self) -> bool {
        matches!(self, BulkAction::ResetToDefaults)
    }
}

impl FromStr for BulkAction {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable-all-non-core" => Ok(BulkAction::EnableAllNonCore),
            "disable-all-optional" => Ok(BulkAction::DisableAllOptional),
            "reset-to-defaults" => Ok(BulkAction::ResetToDefaults),
            other => Err(FeatureError::InvalidBulkAction(other.to_string())),
        }
    }
}

/// Row counts after a bulk action has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub enabled_count: u64,
    pub disabled_count: u64,
}

impl BulkOutcome {
    pub fn tally<I: IntoIterator<Item = bool>>(states: I) -> Self {
        states.into_iter().fold(Self::default(), |mut acc, enabled| {
            if enabled {
                acc.enabled_count += 1;
            } else {
                acc.disabled_count += 1;
            }
            acc
        })
    }
}
