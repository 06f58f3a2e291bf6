use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub features: FeaturesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    /// Allowed browser origins; empty means any origin
    pub cors_origins: Vec<String>,
    /// Admin account created at startup when both fields are set
    pub admin_email: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

// Keep secrets out of `{:?}` output (the config is logged at startup)
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_origins", &self.cors_origins)
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Seed the feature table from the registry when the server starts
    pub initialize_on_startup: bool,
    /// Seed the default system settings when the server starts
    pub seed_settings_on_startup: bool,
    /// How long a client may serve its cached feature set
    pub client_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("PAWCARE_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
                self.database.backend = StorageBackend::Postgres;
            }
        }
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            match v.as_str() {
                "memory" => self.database.backend = StorageBackend::Memory,
                "postgres" => self.database.backend = StorageBackend::Postgres,
                other => tracing::warn!("Ignoring unknown STORAGE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("ADMIN_EMAIL") {
            self.security.admin_email = Some(v);
        }
        if let Ok(v) = env::var("ADMIN_PASSWORD") {
            self.security.admin_password = Some(v);
        }

        // Feature overrides
        if let Ok(v) = env::var("FEATURES_INITIALIZE_ON_STARTUP") {
            self.features.initialize_on_startup = v.parse().unwrap_or(self.features.initialize_on_startup);
        }
        if let Ok(v) = env::var("FEATURES_SEED_SETTINGS_ON_STARTUP") {
            self.features.seed_settings_on_startup =
                v.parse().unwrap_or(self.features.seed_settings_on_startup);
        }
        if let Ok(v) = env::var("FEATURES_CLIENT_CACHE_TTL_SECS") {
            self.features.client_cache_ttl_secs = v.parse().unwrap_or(self.features.client_cache_ttl_secs);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "pawcare-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: Vec::new(),
                admin_email: None,
                admin_password: None,
            },
            features: FeaturesConfig {
                initialize_on_startup: true,
                seed_settings_on_startup: true,
                client_cache_ttl_secs: 5 * 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: Vec::new(),
                admin_email: None,
                admin_password: None,
            },
            features: FeaturesConfig {
                initialize_on_startup: true,
                seed_settings_on_startup: true,
                client_cache_ttl_secs: 5 * 60,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: Vec::new(),
                admin_email: None,
                admin_password: None,
            },
            features: FeaturesConfig {
                initialize_on_startup: true,
                seed_settings_on_startup: false,
                client_cache_ttl_secs: 2 * 60,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
