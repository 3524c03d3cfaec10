//! Bounded leases over a shared driver client.
//!
//! The driver client already pools sockets internally; this layer bounds how
//! many operations may hold a connection at once and ties each hold to a
//! guard, so a lease is returned when the guard drops: after success, after
//! an error, and when the owning future is cancelled.

use mongodb::bson::Document;
use mongodb::{Client, Collection, Database};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

use super::{ConnectionManager, DbTarget, select_collection};
use crate::config::{ConnectionConfig, DbConfig};
use crate::error::{ConnectionError, Result};

/// Pool of scoped connection leases
pub struct ConnectionPool {
    manager: Arc<ConnectionManager>,
    permits: Arc<Semaphore>,
    max_size: usize,
    acquire_timeout: Duration,
}

/// A connection held for exactly one logical operation
///
/// Dropping the lease returns it to the pool.
pub struct ConnectionLease {
    client: Client,
    manager: Arc<ConnectionManager>,
    _permit: OwnedSemaphorePermit,
}

impl ConnectionPool {
    /// Create a pool around a connection manager
    ///
    /// The lease count and acquire timeout come from the manager's
    /// [`ConnectionConfig`]. Nothing is opened until the first acquire.
    pub fn new(manager: ConnectionManager) -> Self {
        let config = manager.connection_config();
        let max_size = config.max_pool_size.max(1) as usize;
        let acquire_timeout = config.connection_timeout();

        Self {
            manager: Arc::new(manager),
            permits: Arc::new(Semaphore::new(max_size)),
            max_size,
            acquire_timeout,
        }
    }

    /// Create a pool straight from configuration
    pub fn from_config(db_config: DbConfig, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(ConnectionManager::new(db_config, config)))
    }

    /// Acquire a lease, connecting on first use
    ///
    /// Waits at most the configured timeout for a free lease.
    ///
    /// # Returns
    /// * `Result<ConnectionLease>` - Lease, `PoolExhausted`, or a connection error
    pub async fn acquire(&self) -> Result<ConnectionLease> {
        let permit = self.acquire_permit().await?;
        // On failure the permit drops here and the slot is free again.
        let client = self.manager.connect().await?;
        trace!("Lease acquired ({} in use)", self.in_use());

        Ok(ConnectionLease {
            client,
            manager: Arc::clone(&self.manager),
            _permit: permit,
        })
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        let acquire = Arc::clone(&self.permits).acquire_owned();
        match tokio::time::timeout(self.acquire_timeout, acquire).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(ConnectionError::NotConnected.into()),
            Err(_elapsed) => {
                debug!(
                    "No lease available after {:?} ({} in use)",
                    self.acquire_timeout, self.max_size
                );
                Err(ConnectionError::PoolExhausted.into())
            }
        }
    }

    /// Number of leases currently free
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Number of leases currently held
    pub fn in_use(&self) -> usize {
        self.max_size - self.available()
    }

    /// Maximum concurrent leases
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The underlying connection manager
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Stop handing out leases and shut the client down
    pub async fn close(&self) -> Result<()> {
        self.permits.close();
        self.manager.disconnect().await
    }
}

impl ConnectionLease {
    /// The leased client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Resolve the production or test database
    pub fn database(&self, target: DbTarget) -> Database {
        self.manager.select_database(&self.client, target)
    }

    /// Resolve a collection within the production or test database
    pub fn collection(&self, target: DbTarget, name: &str) -> Collection<Document> {
        select_collection(&self.database(target), name)
    }
}

impl fmt::Debug for ConnectionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLease")
            .field("uri", &self.manager.uri())
            .finish_non_exhaustive()
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        trace!("Lease released");
    }
}
