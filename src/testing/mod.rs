//! In-process test harness: app state over the memory store with an admin
//! and a regular pet owner already logged in.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::app::{app, AppState};
use crate::config::AppConfig;
use crate::database::models::{SubscriptionTier, User};
use crate::database::MemoryStore;

pub const ADMIN_EMAIL: &str = "admin@pawcare.test";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const OWNER_EMAIL: &str = "owner@pawcare.test";
pub const OWNER_PASSWORD: &str = "owner-pass";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub router: Router,
    pub admin: User,
    pub owner: User,
    pub admin_token: String,
    pub owner_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::development()).await
    }

    /// Build with a custom config; bcrypt cost is always lowered for speed
    pub async fn with_config(mut config: AppConfig) -> Self {
        config.security.bcrypt_cost = 4;

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), None);
        state.bootstrap().await.expect("bootstrap");

        let admin = state
            .users
            .register(ADMIN_EMAIL, "Admin", ADMIN_PASSWORD, true, SubscriptionTier::Premium)
            .await
            .expect("register admin");
        let owner = state
            .users
            .register(OWNER_EMAIL, "Owner", OWNER_PASSWORD, false, SubscriptionTier::Free)
            .await
            .expect("register owner");

        let admin_token = state.users.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.expect("admin login").token;
        let owner_token = state.users.login(OWNER_EMAIL, OWNER_PASSWORD).await.expect("owner login").token;

        Self {
            router: app(state.clone()),
            state,
            store,
            admin,
            owner,
            admin_token,
            owner_token,
        }
    }

    pub async fn feature_id(&self, name: &str) -> uuid::Uuid {
        self.state
            .features
            .list_features()
            .await
            .expect("list features")
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("feature {} missing", name))
            .id
    }
}

/// Send a JSON request through the router and decode the JSON response
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let raw = body.map(|b| b.to_string());
    send_raw(router, method, uri, token, raw.as_deref()).await
}

/// Like `send` but with an arbitrary (possibly malformed) body
pub async fn send_raw(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
