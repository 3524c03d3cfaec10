//! Write operations
//!
//! - insert_one, insert_many
//! - update_one, update_many
//! - delete_one, clear_collection

use mongodb::Collection;
use mongodb::bson::{Bson, Document, doc};
use tracing::{debug, info, warn};

use super::{Validation, check_batch};
use crate::error::{ExecutionError, Result};
use crate::executor::result::{DeleteOutcome, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};
use crate::id::DocumentId;

/// Insert a single document
pub async fn insert_one(
    collection: &Collection<Document>,
    document: Document,
) -> Result<InsertOneOutcome> {
    debug!("Executing insertOne on collection '{}'", collection.name());

    let result = collection.insert_one(document).await?;
    Ok(result.into())
}

/// Insert a batch once `validation` accepts it
///
/// A rejected batch returns `ValidationError::BadData` and nothing is sent
/// to the server. An accepted empty batch is a no-op.
pub async fn insert_many(
    collection: &Collection<Document>,
    documents: Vec<Document>,
    validation: Validation<'_>,
) -> Result<InsertManyOutcome> {
    debug!("Executing insertMany on collection '{}'", collection.name());

    check_batch("insertMany", &documents, validation)?;
    if documents.is_empty() {
        return Ok(InsertManyOutcome::default());
    }

    let result = collection.insert_many(documents).await?;
    Ok(result.into())
}

/// `$set` every field of `document` on the document with the same `_id`
///
/// `_id` stays in the `$set` body; setting it to its current value is a
/// no-op, so an `_id`-only document matches without modifying anything.
pub async fn update_one(
    collection: &Collection<Document>,
    document: Document,
) -> Result<UpdateOutcome> {
    let (id, update) = set_by_id(document)?;
    debug!(
        "Executing updateOne on collection '{}' for _id {}",
        collection.name(),
        id
    );

    let result = collection.update_one(doc! { "_id": id }, update).await?;
    Ok(result.into())
}

/// Apply `stages` as an update pipeline to every document in the collection
///
/// The filter is always empty: the stages' own `_id` fields select nothing.
/// Gated by `validation` like [`insert_many`].
pub async fn update_many(
    collection: &Collection<Document>,
    stages: Vec<Document>,
    validation: Validation<'_>,
) -> Result<UpdateOutcome> {
    debug!(
        "Executing updateMany on collection '{}' with {} stage(s)",
        collection.name(),
        stages.len()
    );

    check_batch("updateMany", &stages, validation)?;
    if stages.is_empty() {
        return Err(ExecutionError::InvalidParameters(
            "updateMany needs at least one pipeline stage".to_string(),
        )
        .into());
    }

    let result = collection.update_many(doc! {}, stages).await?;
    info!(
        "UpdateMany result: matched={}, modified={}",
        result.matched_count, result.modified_count
    );
    Ok(result.into())
}

/// Remove the document whose `_id` equals `id`
pub async fn delete_one(collection: &Collection<Document>, id: &DocumentId) -> Result<DeleteOutcome> {
    debug!(
        "Executing deleteOne on collection '{}' for _id {}",
        collection.name(),
        id
    );

    let result = collection.delete_one(id.filter()).await?;
    Ok(result.into())
}

/// Remove every document in the collection. There is no undo.
pub async fn clear_collection(collection: &Collection<Document>) -> Result<DeleteOutcome> {
    warn!("Clearing every document from collection '{}'", collection.name());

    let result = collection.delete_many(doc! {}).await?;
    Ok(result.into())
}

/// The `_id` of `document` and the `$set` update carrying all of its fields.
pub(crate) fn set_by_id(document: Document) -> Result<(Bson, Document)> {
    match document.get("_id") {
        Some(Bson::Null) | None => Err(ExecutionError::InvalidParameters(
            "document must include an _id".to_string(),
        )
        .into()),
        Some(id) => Ok((id.clone(), doc! { "$set": document })),
    }
}
