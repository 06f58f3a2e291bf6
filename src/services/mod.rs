pub mod settings_service;
pub mod user_service;

pub use settings_service::{SettingsError, SettingsService, UserLimits};
pub use user_service::{Session, UserService, UserServiceError};
