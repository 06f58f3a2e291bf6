pub mod feature;
pub mod setting;
pub mod user;

pub use feature::{feature_order, Feature, FeatureSeed, UserFeatureOverride};
pub use setting::{SettingInput, SystemSetting};
pub use user::{NewUser, SubscriptionTier, User, UserPatch};
