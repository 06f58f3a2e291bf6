use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::ClientError;
use crate::database::models::{Feature, SettingInput, SystemSetting, User, UserPatch};
use crate::features::{BulkAction, BulkOutcome, FeatureConfig};

/// Where an `EntitlementCache` gets its enabled feature names from
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn fetch_enabled(&self, user_id: Option<Uuid>) -> Result<BTreeSet<String>, ClientError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    features: Vec<FeatureConfig>,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    settings: Vec<SystemSetting>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
}

/// Typed wrapper over the PawCare HTTP API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotLoggedIn);
        }
        Ok(self.request(method, path))
    }

    /// Send and decode, turning non-2xx `{error}` bodies into `ClientError::Api`
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
            .to_string();
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(self.request(Method::GET, "/health")).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let builder = self
            .request(Method::POST, "/api/auth/login")
            .json(&json!({ "email": email, "password": password }));
        self.send(builder).await
    }

    pub async fn whoami(&self) -> Result<Value, ClientError> {
        self.send(self.authed(Method::GET, "/api/auth/whoami")?).await
    }

    pub async fn features(&self, user_id: Option<Uuid>) -> Result<Vec<FeatureConfig>, ClientError> {
        let mut builder = self.authed(Method::GET, "/api/features")?;
        if let Some(user_id) = user_id {
            builder = builder.query(&[("userId", user_id.to_string())]);
        }
        let response: FeaturesResponse = self.send(builder).await?;
        Ok(response.features)
    }

    pub async fn set_feature(&self, name: &str, user_id: Option<Uuid>, enabled: bool) -> Result<(), ClientError> {
        let builder = self.authed(Method::POST, "/api/features")?.json(&json!({
            "featureName": name,
            "userId": user_id,
            "enabled": enabled,
        }));
        let _: Value = self.send(builder).await?;
        Ok(())
    }

    pub async fn clear_override(&self, name: &str, user_id: Uuid) -> Result<bool, ClientError> {
        let path = format!("/api/features/{}/users/{}", name, user_id);
        let body: Value = self.send(self.authed(Method::DELETE, &path)?).await?;
        Ok(body["removed"].as_bool().unwrap_or(false))
    }

    pub async fn limits(&self) -> Result<Value, ClientError> {
        self.send(self.authed(Method::GET, "/api/features/limits")?).await
    }

    pub async fn admin_features(&self) -> Result<Vec<Feature>, ClientError> {
        self.send(self.authed(Method::GET, "/api/admin/features")?).await
    }

    pub async fn patch_feature(&self, id: Uuid, enabled: bool) -> Result<Feature, ClientError> {
        let builder = self
            .authed(Method::PATCH, &format!("/api/admin/features/{}", id))?
            .json(&json!({ "isEnabled": enabled }));
        self.send(builder).await
    }

    pub async fn delete_feature(&self, id: Uuid) -> Result<(), ClientError> {
        let _: Value = self
            .send(self.authed(Method::DELETE, &format!("/api/admin/features/{}", id))?)
            .await?;
        Ok(())
    }

    pub async fn bulk(&self, action: BulkAction) -> Result<BulkOutcome, ClientError> {
        let builder = self
            .authed(Method::POST, "/api/admin/features/bulk")?
            .json(&json!({ "action": action.as_str() }));
        self.send(builder).await
    }

    pub async fn initialize_features(&self) -> Result<u64, ClientError> {
        let body: Value = self
            .send(self.authed(Method::POST, "/api/admin/features/initialize")?)
            .await?;
        Ok(body["inserted"].as_u64().unwrap_or(0))
    }

    pub async fn settings(&self) -> Result<Vec<SystemSetting>, ClientError> {
        let response: SettingsResponse = self.send(self.authed(Method::GET, "/api/admin/settings")?).await?;
        Ok(response.settings)
    }

    pub async fn update_settings(&self, settings: &[SettingInput]) -> Result<Vec<SystemSetting>, ClientError> {
        let builder = self
            .authed(Method::POST, "/api/admin/settings")?
            .json(&json!({ "settings": settings }));
        let response: SettingsResponse = self.send(builder).await?;
        Ok(response.settings)
    }

    pub async fn seed_settings(&self) -> Result<u64, ClientError> {
        let body: Value = self.send(self.authed(Method::PUT, "/api/admin/settings")?).await?;
        Ok(body["inserted"].as_u64().unwrap_or(0))
    }

    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        let response: UsersResponse = self.send(self.authed(Method::GET, "/api/admin/users")?).await?;
        Ok(response.users)
    }

    pub async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<User, ClientError> {
        let builder = self
            .authed(Method::PATCH, &format!("/api/admin/users/{}", id))?
            .json(patch);
        self.send(builder).await
    }
}

#[async_trait]
impl FeatureSource for ApiClient {
    async fn fetch_enabled(&self, user_id: Option<Uuid>) -> Result<BTreeSet<String>, ClientError> {
        let features = self.features(user_id).await?;
        Ok(features
            .into_iter()
            .filter(|f| f.is_enabled)
            .map(|f| f.name)
            .collect())
    }
}
