//! Read operations: find_all, find_by_id, find_by_value, count_documents

use futures::stream::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use tracing::debug;

use crate::error::Result;
use crate::id::DocumentId;

/// Every document in the collection, in server order
pub async fn find_all(collection: &Collection<Document>) -> Result<Vec<Document>> {
    debug!("Executing find on collection '{}'", collection.name());

    let cursor = collection.find(doc! {}).await?;
    let documents: Vec<Document> = cursor.try_collect().await?;
    Ok(documents)
}

/// The document whose `_id` equals `id`
pub async fn find_by_id(
    collection: &Collection<Document>,
    id: &DocumentId,
) -> Result<Option<Document>> {
    debug!(
        "Executing findOne on collection '{}' for _id {}",
        collection.name(),
        id
    );

    Ok(collection.find_one(id.filter()).await?)
}

/// The first document matching every field of `filter`
pub async fn find_by_value(
    collection: &Collection<Document>,
    filter: Document,
) -> Result<Option<Document>> {
    debug!(
        "Executing findOne on collection '{}' with filter: {:?}",
        collection.name(),
        filter
    );

    Ok(collection.find_one(filter).await?)
}

/// Number of documents in the collection
pub async fn count_documents(collection: &Collection<Document>) -> Result<u64> {
    Ok(collection.count_documents(doc! {}).await?)
}
