pub mod auth_tokens;
pub mod feed;
pub mod files;
pub mod manager;
pub mod models;
pub mod plans;
pub mod portals;
pub mod usage_store;
pub mod users;

pub use manager::{Database, DatabaseError};
pub use usage_store::PgUsageStore;
