use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::features::FeatureManager;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_admin_middleware, validate_user_middleware};
use crate::services::{SettingsService, UserService};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub features: Arc<FeatureManager>,
    pub settings: Arc<SettingsService>,
    pub users: Arc<UserService>,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    pub fn new<S: Store + 'static>(config: AppConfig, store: Arc<S>, db_pool: Option<PgPool>) -> Self {
        let users = UserService::new(store.clone(), config.security.clone());
        Self {
            features: Arc::new(FeatureManager::new(store.clone(), store.clone())),
            settings: Arc::new(SettingsService::new(store)),
            users: Arc::new(users),
            config: Arc::new(config),
            db_pool,
        }
    }

    /// Startup seeding: registry features, default settings, bootstrap admin
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        if self.config.features.initialize_on_startup {
            self.features
                .initialize_features()
                .await
                .context("failed to initialize features")?;
        }
        if self.config.features.seed_settings_on_startup {
            self.settings
                .seed_defaults()
                .await
                .context("failed to seed default settings")?;
        }
        self.users
            .ensure_bootstrap_admin()
            .await
            .context("failed to create bootstrap admin")?;
        Ok(())
    }
}

/// Open the configured storage backend and run startup seeding
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let state = match config.database.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            AppState::new(config, Arc::new(MemoryStore::new()), None)
        }
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::ensure_schema(&pool).await?;
            info!("Connected to PostgreSQL");
            AppState::new(config, Arc::new(PgStore::new(pool.clone())), Some(pool))
        }
    };

    state.bootstrap().await?;
    Ok(state)
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Session required
        .merge(protected_routes(state.clone()))
        // Session + admin required
        .merge(admin_routes(state.clone()))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new().route("/api/auth/login", post(auth::session_login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, features};

    // route_layer: the last layer added runs first
    Router::new()
        .route("/api/auth/whoami", get(auth::session_whoami))
        .route(
            "/api/features",
            get(features::features_get).post(features::features_post),
        )
        .route("/api/features/limits", get(features::limits_get))
        .route(
            "/api/features/:name/users/:user_id",
            delete(features::override_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use handlers::elevated::admin::{features, settings, users};

    Router::new()
        .route("/api/admin/features", get(features::features_list))
        .route(
            "/api/admin/features/:id",
            axum::routing::patch(features::feature_patch).delete(features::feature_delete),
        )
        .route("/api/admin/features/bulk", post(features::features_bulk))
        .route("/api/admin/features/initialize", post(features::features_initialize))
        .route(
            "/api/admin/settings",
            get(settings::settings_get)
                .post(settings::settings_post)
                .put(settings::settings_seed),
        )
        .route("/api/admin/users", get(users::users_list))
        .route(
            "/api/admin/users/:id",
            axum::routing::patch(users::user_patch).delete(users::user_delete),
        )
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "PawCare API",
            "version": version,
            "description": "Feature entitlement and admin configuration service",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/api/auth/login (public)",
                "auth": "/api/auth/whoami (protected)",
                "features": "/api/features[/limits] (protected, writes require admin)",
                "admin": "/api/admin/{features,settings,users} (admin)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let Some(pool) = &state.db_pool else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "memory" }
            })),
        );
    };

    match DatabaseManager::health_check(pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
