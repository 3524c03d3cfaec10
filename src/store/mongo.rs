use async_trait::async_trait;
use mongodb::bson::Document;

use super::Store;
use crate::connection::DbTarget;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::executor::operations::{self, accept_all};
use crate::executor::result::{DeleteOutcome, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};
use crate::id::DocumentId;

/// [`Store`] backed by a MongoDB collection
///
/// Every method is one executor invocation: lease, resolve, run, release.
#[derive(Clone)]
pub struct MongoStore {
    executor: CommandExecutor,
    collection: String,
    target: DbTarget,
}

impl MongoStore {
    pub fn new(executor: CommandExecutor, collection: impl Into<String>, target: DbTarget) -> Self {
        Self {
            executor,
            collection: collection.into(),
            target,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn target(&self) -> DbTarget {
        self.target
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<i32> {
        self.executor.ping(self.target).await
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::find_all(&coll).await
            })
            .await
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>> {
        let id = *id;
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::find_by_id(&coll, &id).await
            })
            .await
    }

    async fn find_by_value(&self, filter: Document) -> Result<Option<Document>> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::find_by_value(&coll, filter).await
            })
            .await
    }

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::insert_one(&coll, document).await
            })
            .await
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::insert_many(&coll, documents, &accept_all).await
            })
            .await
    }

    async fn update_one(&self, document: Document) -> Result<UpdateOutcome> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::update_one(&coll, document).await
            })
            .await
    }

    async fn update_many(&self, stages: Vec<Document>) -> Result<UpdateOutcome> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::update_many(&coll, stages, &accept_all).await
            })
            .await
    }

    async fn delete_one(&self, id: &DocumentId) -> Result<DeleteOutcome> {
        let id = *id;
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::delete_one(&coll, &id).await
            })
            .await
    }

    async fn clear(&self) -> Result<DeleteOutcome> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::clear_collection(&coll).await
            })
            .await
    }

    async fn count(&self) -> Result<u64> {
        self.executor
            .execute(&self.collection, self.target, |coll| async move {
                operations::count_documents(&coll).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigInput, ConnectionConfig, MapEnv, configure};
    use crate::connection::ConnectionPool;
    use mongodb::bson::doc;

    async fn live_store(collection: &str) -> MongoStore {
        let env = MapEnv::new();
        let db_config = configure(
            &ConfigInput::new("localhost", 27017, "app", "app-test"),
            &env,
        )
        .unwrap();
        let pool = ConnectionPool::from_config(db_config, ConnectionConfig::default()).unwrap();
        let store = CommandExecutor::new(pool).store(collection, DbTarget::Test);
        store.clear().await.unwrap();
        store
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB server on localhost:27017"]
    async fn test_ping_insert_find_all() {
        let store = live_store("mongo_curry_scenario").await;
        assert_eq!(store.ping().await.unwrap(), 1);

        let outcome = store.insert_one(doc! { "name": "a" }).await.unwrap();
        let id = outcome.id().expect("generated ObjectId");

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![doc! { "_id": id.object_id(), "name": "a" }]);
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB server on localhost:27017"]
    async fn test_round_trip_and_delete() {
        let store = live_store("mongo_curry_round_trip").await;
        let id = DocumentId::new();
        let document = doc! { "_id": id.object_id(), "name": "b", "n": 2 };

        store.insert_one(document.clone()).await.unwrap();
        assert_eq!(store.find_by_id(&id).await.unwrap(), Some(document));

        let updated = store
            .update_one(doc! { "_id": id.object_id(), "n": 3 })
            .await
            .unwrap();
        assert_eq!(updated, UpdateOutcome { matched: 1, modified: 1 });
        let found = store.find_by_value(doc! { "n": 3 }).await.unwrap().unwrap();
        assert_eq!(DocumentId::of(&found), Some(id));

        let deleted = store.delete_one(&id).await.unwrap();
        assert_eq!(deleted.deleted, 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB server on localhost:27017"]
    async fn test_update_one_with_only_id() {
        let store = live_store("mongo_curry_id_only").await;
        let id = DocumentId::new();
        store
            .insert_one(doc! { "_id": id.object_id(), "n": 1 })
            .await
            .unwrap();

        let outcome = store.update_one(doc! { "_id": id.object_id() }).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB server on localhost:27017"]
    async fn test_rejected_batch_writes_nothing() {
        let store = live_store("mongo_curry_validation").await;
        let reject = |_: &[Document]| false;

        let err = store
            .insert_many_validated(vec![doc! { "x": 1 }, doc! { "x": 2 }], &reject)
            .await
            .unwrap_err();
        assert!(err.is_bad_data());
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .insert_many(vec![doc! { "x": 1 }, doc! { "x": 2 }])
            .await
            .unwrap();
        let cleared = store.clear().await.unwrap();
        assert_eq!(cleared.deleted, 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
