//! mongo-curry
//!
//! Helpers for the everyday MongoDB collection operations: find all, find by
//! id, find by filter, insert one/many, update one/many, delete one, clear a
//! collection, and ping. Each call leases a pooled connection, selects the
//! production or test database and the named collection, runs the operation,
//! and releases the lease.
//!
//! # Modules
//!
//! - `config`: Database configuration, environment publishing, settings file
//! - `connection`: Connection manager, scope selection, lease pool
//! - `error`: Error types and handling
//! - `executor`: Command executor and built-in operations
//! - `id`: Document identifiers
//! - `logging`: Tracing subscriber setup
//! - `store`: The `Store` trait and its MongoDB and in-memory implementations
//!
//! # Example
//!
//! ```no_run
//! use mongo_curry::config::{ConfigInput, ConnectionConfig, ProcessEnv, configure};
//! use mongo_curry::connection::{ConnectionPool, DbTarget};
//! use mongo_curry::executor::CommandExecutor;
//! use mongo_curry::store::Store;
//! use mongodb::bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> mongo_curry::Result<()> {
//!     let db_config = configure(
//!         &ConfigInput::new("localhost", 27017, "app", "app-test"),
//!         &ProcessEnv,
//!     )?;
//!     let pool = ConnectionPool::from_config(db_config, ConnectionConfig::default())?;
//!     let executor = CommandExecutor::new(pool);
//!
//!     assert_eq!(executor.ping(DbTarget::Test).await?, 1);
//!
//!     let users = executor.store("users", DbTarget::Test);
//!     let outcome = users.insert_one(doc! { "name": "a" }).await?;
//!     println!("inserted {:?}", outcome.inserted_id);
//!     println!("{:?}", users.find_all().await?);
//!
//!     executor.shutdown().await
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod id;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use config::{ConfigInput, DbConfig, configure};
pub use connection::{ConnectionManager, ConnectionPool, DbTarget};
pub use error::{MongoCurryError, Result};
pub use executor::CommandExecutor;
pub use id::DocumentId;
pub use store::{MemoryStore, MongoStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
