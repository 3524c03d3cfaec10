//! Command execution engine
//!
//! This module provides the [`CommandExecutor`], which runs one operation per
//! invocation:
//! 1. lease a connection from the pool
//! 2. resolve the production or test database, then the collection
//! 3. run the operation with that collection and await it
//! 4. release the lease (on success, error, or cancellation)
//!
//! Operation functions live in [`operations`]; the typed results they
//! return live in [`result`].

use std::future::Future;
use std::sync::Arc;

use mongodb::Collection;
use mongodb::bson::Document;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span};
use uuid::Uuid;

use crate::connection::{ConnectionPool, DbTarget};
use crate::error::{ExecutionError, Result};
use crate::store::MongoStore;

pub mod operations;
pub mod result;

pub use result::{DeleteOutcome, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};

/// Runs operations against pooled connections
#[derive(Clone)]
pub struct CommandExecutor {
    pool: Arc<ConnectionPool>,
}

impl CommandExecutor {
    /// Create an executor that owns `pool`
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create an executor over a pool shared with other executors
    pub fn with_shared_pool(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// The pool leases are drawn from
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run `op` against `collection` in the `target` database
    ///
    /// The operation receives the resolved collection and captures its own
    /// arguments. The lease is held only while `op` runs.
    ///
    /// # Arguments
    /// * `collection` - Collection name
    /// * `target` - Production or test database
    /// * `op` - Operation to run
    ///
    /// # Returns
    /// * `Result<T>` - Whatever the operation returns
    pub async fn execute<T, F, Fut>(&self, collection: &str, target: DbTarget, op: F) -> Result<T>
    where
        F: FnOnce(Collection<Document>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let op_id = Uuid::new_v4();
        let span = debug_span!("execute", %op_id, collection, ?target);

        async move {
            let lease = self.pool.acquire().await?;
            let handle = lease.collection(target, collection);

            let result = op(handle).await;
            drop(lease);

            if let Err(e) = &result {
                debug!("Operation failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Like [`execute`](Self::execute), but gives up when `token` is cancelled
    ///
    /// A cancelled call returns `ExecutionError::Cancelled`; its lease is
    /// released as the in-flight operation is dropped.
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        collection: &str,
        target: DbTarget,
        token: &CancellationToken,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce(Collection<Document>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Operation on '{}' cancelled", collection);
                Err(ExecutionError::Cancelled.into())
            }
            result = self.execute(collection, target, op) => result,
        }
    }

    /// Run `op` against a collection the caller already resolved
    ///
    /// No lease is taken; the caller owns the connection behind `collection`.
    pub async fn storage_action_on<T, F, Fut>(collection: Collection<Document>, op: F) -> Result<T>
    where
        F: FnOnce(Collection<Document>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        op(collection).await
    }

    /// Ping the production or test database
    ///
    /// # Returns
    /// * `Result<i32>` - 1 when the server is healthy
    pub async fn ping(&self, target: DbTarget) -> Result<i32> {
        let op_id = Uuid::new_v4();
        let span = debug_span!("ping", %op_id, ?target);

        async move {
            let lease = self.pool.acquire().await?;
            let ok = operations::ping(&lease.database(target)).await;
            drop(lease);

            if let Err(e) = &ok {
                debug!("Ping failed: {}", e);
            }
            ok
        }
        .instrument(span)
        .await
    }

    /// A [`Store`](crate::store::Store) bound to one collection
    pub fn store(&self, collection: impl Into<String>, target: DbTarget) -> MongoStore {
        MongoStore::new(self.clone(), collection, target)
    }

    /// Close the pool
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, DbConfig};
    use crate::error::{ConnectionError, MongoCurryError};

    fn unreachable_executor() -> CommandExecutor {
        let db_config = DbConfig {
            endpoint_host: "127.0.0.1".to_string(),
            endpoint_port: 1,
            database_name: "app".to_string(),
            test_database_name: "app-test".to_string(),
        };
        let config = ConnectionConfig {
            timeout: 1,
            max_pool_size: 2,
            min_pool_size: 0,
            ..ConnectionConfig::default()
        };
        CommandExecutor::new(ConnectionPool::from_config(db_config, config).unwrap())
    }

    async fn seeded_executor() -> CommandExecutor {
        let executor = unreachable_executor();
        let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:1")
            .await
            .unwrap();
        executor.pool().manager().seed_client(client).await;
        executor
    }

    #[tokio::test]
    async fn test_operation_error_releases_lease() {
        let executor = seeded_executor().await;
        let pool = Arc::clone(&executor.pool);

        let result: Result<u64> = executor
            .execute("users", DbTarget::Test, |coll| {
                let pool = Arc::clone(&pool);
                async move {
                    assert_eq!(pool.in_use(), 1);
                    assert_eq!(coll.namespace().to_string(), "app-test.users");
                    Err::<u64, MongoCurryError>(
                        ExecutionError::InvalidParameters("rejected".to_string()).into(),
                    )
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(MongoCurryError::Execution(ExecutionError::InvalidParameters(_)))
        ));
        assert_eq!(executor.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_cancel_while_lease_held_releases_it() {
        let executor = seeded_executor().await;
        let token = CancellationToken::new();

        let canceller = {
            let executor = executor.clone();
            let token = token.clone();
            tokio::spawn(async move {
                while executor.pool().in_use() == 0 {
                    tokio::task::yield_now().await;
                }
                token.cancel();
            })
        };

        let result: Result<u64> = executor
            .execute_cancellable("users", DbTarget::Test, &token, |_coll| async move {
                std::future::pending::<Result<u64>>().await
            })
            .await;
        canceller.await.unwrap();

        assert!(matches!(
            result,
            Err(MongoCurryError::Execution(ExecutionError::Cancelled))
        ));
        assert_eq!(executor.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_and_releases() {
        let executor = unreachable_executor();
        let err = executor
            .execute("users", DbTarget::Test, |coll| async move {
                operations::count_documents(&coll).await
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MongoCurryError::Connection(ConnectionError::ConnectionFailed(_))
        ));
        assert_eq!(executor.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_ping_failure_surfaces_and_releases() {
        let executor = unreachable_executor();
        let err = executor.ping(DbTarget::Production).await.unwrap_err();

        assert!(matches!(
            err,
            MongoCurryError::Connection(ConnectionError::ConnectionFailed(_))
        ));
        assert_eq!(executor.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let executor = unreachable_executor();
        let token = CancellationToken::new();
        token.cancel();

        let result: Result<u64> = executor
            .execute_cancellable("users", DbTarget::Test, &token, |coll| async move {
                operations::count_documents(&coll).await
            })
            .await;

        assert!(matches!(
            result,
            Err(MongoCurryError::Execution(ExecutionError::Cancelled))
        ));
        assert_eq!(executor.pool().in_use(), 0);
    }

    #[tokio::test]
    async fn test_storage_action_on_passes_collection_through() {
        let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:1")
            .await
            .unwrap();
        let collection = client.database("app-test").collection::<Document>("users");

        let name = CommandExecutor::storage_action_on(collection, |coll| async move {
            Ok(coll.namespace().to_string())
        })
        .await
        .unwrap();

        assert_eq!(name, "app-test.users");
    }
}
