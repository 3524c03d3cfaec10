//! Connection management for MongoDB
//!
//! This module provides:
//! - Connection establishment and termination ([`ConnectionManager`])
//! - Database and collection scope selection
//! - A bounded pool of scoped leases ([`ConnectionPool`], [`ConnectionLease`])
//! - Health checks

use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::{ConnectionConfig, DbConfig};
use crate::error::{ConnectionError, Result};

mod pool;

pub use pool::{ConnectionLease, ConnectionPool};

/// Which configured database an operation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbTarget {
    /// The production database (`DB_NAME`)
    #[default]
    Production,

    /// The test database (`TEST_DB_NAME`)
    Test,
}

impl DbTarget {
    /// Pick the target from a `use_test` flag.
    pub fn from_use_test(use_test: bool) -> Self {
        if use_test { DbTarget::Test } else { DbTarget::Production }
    }

    /// Database name this target resolves to.
    pub fn database_name<'a>(&self, config: &'a DbConfig) -> &'a str {
        match self {
            DbTarget::Production => &config.database_name,
            DbTarget::Test => &config.test_database_name,
        }
    }
}

impl From<bool> for DbTarget {
    fn from(use_test: bool) -> Self {
        DbTarget::from_use_test(use_test)
    }
}

/// MongoDB connection manager
///
/// Opens the driver client for the configured endpoint, tracks its state,
/// and resolves database handles.
pub struct ConnectionManager {
    /// Connected client, once established
    client: RwLock<Option<Client>>,

    /// Database endpoint and names
    db_config: DbConfig,

    /// Pool and timeout settings
    config: ConnectionConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Connection failed
    Failed(String),
}

/// Health check result
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the server answered the ping
    pub is_healthy: bool,

    /// Response time in milliseconds
    pub response_time_ms: u64,

    /// Server version
    pub server_version: Option<String>,
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `db_config` - Database endpoint and names
    /// * `config` - Pool and timeout settings
    pub fn new(db_config: DbConfig, config: ConnectionConfig) -> Self {
        Self {
            client: RwLock::new(None),
            db_config,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Connection URI for the configured endpoint
    pub fn uri(&self) -> String {
        self.db_config.uri()
    }

    /// Database configuration
    pub fn db_config(&self) -> &DbConfig {
        &self.db_config
    }

    /// Pool and timeout settings
    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Establish the connection, or return the existing client
    ///
    /// A failure is logged and returned; the manager moves to
    /// [`ConnectionState::Failed`] and a later call tries again.
    ///
    /// # Returns
    /// * `Result<Client>` - Connected client or connection error
    pub async fn connect(&self) -> Result<Client> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        self.set_state(ConnectionState::Connecting).await;
        match self.open().await {
            Ok(client) => {
                info!("Connected to {}", self.uri());
                *slot = Some(client.clone());
                self.set_state(ConnectionState::Connected).await;
                Ok(client)
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", self.uri(), e);
                self.set_state(ConnectionState::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Disconnect from MongoDB
    ///
    /// Shuts the driver client down; in-flight operations on clones of the
    /// client finish first.
    pub async fn disconnect(&self) -> Result<()> {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            client.shutdown().await;
            info!("Disconnected from {}", self.uri());
        }
        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Get the connected client
    ///
    /// # Returns
    /// * `Result<Client>` - Client or `NotConnected`
    pub async fn get_client(&self) -> Result<Client> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Perform health check on the connection
    ///
    /// # Returns
    /// * `Result<HealthStatus>` - Health check results or error
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let client = self.get_client().await?;
        let admin = client.database("admin");

        let start = Instant::now();
        let ping = admin.run_command(doc! { "ping": 1 }).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let is_healthy = matches!(&ping, Ok(reply) if ok_value(reply) == 1);
        let server_version = match admin.run_command(doc! { "buildInfo": 1 }).await {
            Ok(info) => info.get_str("version").ok().map(str::to_string),
            Err(e) => {
                debug!("buildInfo failed: {}", e);
                None
            }
        };

        Ok(HealthStatus {
            is_healthy,
            response_time_ms,
            server_version,
        })
    }

    /// Get current connection state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    /// Resolve the production or test database on `client`
    pub fn select_database(&self, client: &Client, target: DbTarget) -> Database {
        select_database(client, &self.db_config, target)
    }

    async fn open(&self) -> Result<Client> {
        let options = ClientOptions::parse(self.uri())
            .await
            .map_err(|e| ConnectionError::InvalidUri(e.to_string()))?;
        let options = self.configure_pool(options);

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        // The driver connects lazily; a ping makes failures surface here.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        Ok(client)
    }

    /// Apply pool and timeout settings to parsed client options
    fn configure_pool(&self, mut options: ClientOptions) -> ClientOptions {
        let timeout = self.config.connection_timeout();
        options.max_pool_size = Some(self.config.max_pool_size);
        options.min_pool_size = Some(self.config.min_pool_size);
        options.max_idle_time = Some(self.config.idle_timeout());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        if let Some(app_name) = &self.config.app_name {
            options.app_name = Some(app_name.clone());
        }
        options
    }

    /// Install an already-built client, skipping the reachability ping
    #[cfg(test)]
    pub(crate) async fn seed_client(&self, client: Client) {
        *self.client.write().await = Some(client);
        self.set_state(ConnectionState::Connected).await;
    }

    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }
}

/// Resolve the production or test database named in `config`
pub fn select_database(client: &Client, config: &DbConfig, target: DbTarget) -> Database {
    client.database(target.database_name(config))
}

/// Resolve a collection of raw documents within `database`
pub fn select_collection(database: &Database, name: &str) -> Collection<Document> {
    database.collection::<Document>(name)
}

/// Numeric `ok` field of a command reply; 0 when absent.
pub fn ok_value(reply: &Document) -> i32 {
    use mongodb::bson::Bson;

    match reply.get("ok") {
        Some(Bson::Double(v)) => *v as i32,
        Some(Bson::Int32(v)) => *v,
        Some(Bson::Int64(v)) => *v as i32,
        Some(Bson::Boolean(v)) => i32::from(*v),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn db_config() -> DbConfig {
        DbConfig {
            endpoint_host: "localhost".to_string(),
            endpoint_port: 27017,
            database_name: "app".to_string(),
            test_database_name: "app-test".to_string(),
        }
    }

    #[test]
    fn test_target_resolves_database_name() {
        let config = db_config();
        assert_eq!(DbTarget::Production.database_name(&config), "app");
        assert_eq!(DbTarget::Test.database_name(&config), "app-test");
        assert_eq!(DbTarget::from(true), DbTarget::Test);
        assert_eq!(DbTarget::from(false), DbTarget::Production);
    }

    #[test]
    fn test_ok_value_variants() {
        assert_eq!(ok_value(&doc! { "ok": 1.0 }), 1);
        assert_eq!(ok_value(&doc! { "ok": 1 }), 1);
        assert_eq!(ok_value(&doc! { "ok": 0_i64 }), 0);
        assert_eq!(ok_value(&doc! {}), 0);
    }

    #[test]
    fn test_configure_pool_applies_settings() {
        let manager = ConnectionManager::new(
            db_config(),
            ConnectionConfig {
                max_pool_size: 4,
                app_name: Some("svc".to_string()),
                ..ConnectionConfig::default()
            },
        );
        let options = manager.configure_pool(ClientOptions::builder().build());
        assert_eq!(options.max_pool_size, Some(4));
        assert_eq!(options.min_pool_size, Some(2));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.app_name.as_deref(), Some("svc"));
        assert_eq!(manager.uri(), "mongodb://localhost:27017");
    }

    #[tokio::test]
    async fn test_initial_state_is_disconnected() {
        let manager = ConnectionManager::new(db_config(), ConnectionConfig::default());
        assert_eq!(manager.get_state().await, ConnectionState::Disconnected);
        assert!(!manager.is_connected().await);
        assert!(manager.get_client().await.is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_is_propagated() {
        let mut config = db_config();
        // Nothing listens on port 1.
        config.endpoint_host = "127.0.0.1".to_string();
        config.endpoint_port = 1;
        let manager = ConnectionManager::new(
            config,
            ConnectionConfig {
                timeout: 1,
                ..ConnectionConfig::default()
            },
        );

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::MongoCurryError::Connection(ConnectionError::ConnectionFailed(_))
        ));
        assert!(matches!(manager.get_state().await, ConnectionState::Failed(_)));
    }
}
