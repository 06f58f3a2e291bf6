use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{self, AuthError, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{NewUser, SubscriptionTier, User, UserPatch};
use crate::database::store::{StoreError, UserStore};

/// Credential checks, token issuing and admin user management
pub struct UserService {
    store: Arc<dyn UserStore>,
    security: SecurityConfig,
}

/// Successful login
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_in: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, UserServiceError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            warn!("Login failed: unknown email '{}'", email);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !auth::verify_password(password, &user.password_hash) {
            warn!("Login failed: bad password for '{}'", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let claims = Claims::for_user(&user, self.security.jwt_expiry_hours);
        let token = auth::generate_jwt(&claims, &self.security)?;
        info!("User {} logged in (admin={})", user.id, user.is_admin);

        Ok(Session {
            token,
            user,
            expires_in: self.security.jwt_expiry_hours * 3600,
        })
    }

    /// Create or update an account with a freshly hashed password
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
        is_admin: bool,
        tier: SubscriptionTier,
    ) -> Result<User, UserServiceError> {
        let password_hash = auth::hash_password(password, self.security.bcrypt_cost)?;
        let user = self
            .store
            .upsert_user(&NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
                is_admin,
                subscription_tier: tier,
            })
            .await?;
        Ok(user)
    }

    /// Ensure the configured bootstrap admin exists. No-op without ADMIN_EMAIL/ADMIN_PASSWORD.
    pub async fn ensure_bootstrap_admin(&self) -> Result<Option<User>, UserServiceError> {
        let (Some(email), Some(password)) = (&self.security.admin_email, &self.security.admin_password) else {
            return Ok(None);
        };

        let admin = self
            .register(email, "Administrator", password, true, SubscriptionTier::Premium)
            .await?;
        info!("Bootstrap admin '{}' ready", admin.email);
        Ok(Some(admin))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.store.find_user(id).await
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.store.list_users().await
    }

    pub async fn update(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>, StoreError> {
        self.store.update_user(id, patch).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete_user(id).await
    }
}
