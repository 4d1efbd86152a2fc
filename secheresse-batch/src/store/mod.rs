//! Accès à la base des abonnements

pub mod pool;
pub mod postgres;

pub use pool::{create_pool, test_connection, DatabaseConfig, DatabaseOverrides, SslMode};
pub use postgres::{PgSubscriptionStore, DEFAULT_SCHEMA};
