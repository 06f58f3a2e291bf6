pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{FeatureStore, SettingsStore, Store, StoreError, UserStore};
