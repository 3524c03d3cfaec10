//! Collection-level store capability
//!
//! [`Store`] exposes the built-in operations as typed methods so callers can
//! take an injected `Arc<dyn Store>` instead of wiring executors and
//! collection names themselves.
//!
//! Implementations:
//! - [`MongoStore`]: one executor invocation per method call
//! - [`MemoryStore`]: an in-process collection for tests and offline use

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::error::Result;
use crate::executor::operations::{Validation, check_batch};
use crate::executor::result::{DeleteOutcome, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};
use crate::id::DocumentId;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Typed operations over one collection
#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check; 1 when healthy
    async fn ping(&self) -> Result<i32>;

    /// Every document, in store order
    async fn find_all(&self) -> Result<Vec<Document>>;

    /// The document with this `_id`
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// The first document matching every field of `filter`
    async fn find_by_value(&self, filter: Document) -> Result<Option<Document>>;

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome>;

    /// Insert without a validation gate
    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome>;

    /// `$set` the fields of `document` on the document sharing its `_id`
    async fn update_one(&self, document: Document) -> Result<UpdateOutcome>;

    /// Apply `stages` as an update pipeline to every document, without a validation gate
    async fn update_many(&self, stages: Vec<Document>) -> Result<UpdateOutcome>;

    async fn delete_one(&self, id: &DocumentId) -> Result<DeleteOutcome>;

    /// Remove every document. There is no undo.
    async fn clear(&self) -> Result<DeleteOutcome>;

    /// Number of documents
    async fn count(&self) -> Result<u64>;

    /// Insert `documents` if `validation` accepts them, else `BadData`
    async fn insert_many_validated(
        &self,
        documents: Vec<Document>,
        validation: Validation<'_>,
    ) -> Result<InsertManyOutcome> {
        check_batch("insertMany", &documents, validation)?;
        self.insert_many(documents).await
    }

    /// Run [`update_many`](Store::update_many) if `validation` accepts the stages, else `BadData`
    async fn update_many_validated(
        &self,
        stages: Vec<Document>,
        validation: Validation<'_>,
    ) -> Result<UpdateOutcome> {
        check_batch("updateMany", &stages, validation)?;
        self.update_many(stages).await
    }
}
