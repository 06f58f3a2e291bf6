//! Client side of the entitlement service: a typed HTTP client for the API
//! and the per-session feature cache that UIs and the CLI read from.

pub mod cache;
pub mod clock;
pub mod http;

use thiserror::Error;

pub use cache::EntitlementCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use http::{ApiClient, FeatureSource, LoginResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not logged in")]
    NotLoggedIn,
}
