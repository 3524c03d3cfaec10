use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::Store;
use crate::error::{ExecutionError, Result};
use crate::executor::operations::set_by_id;
use crate::executor::result::{DeleteOutcome, InsertManyOutcome, InsertOneOutcome, UpdateOutcome};
use crate::id::DocumentId;

/// In-process [`Store`] holding documents in insertion order
///
/// Filters match on top-level field equality only. Update pipelines accept
/// `$set`/`$addFields` and `$unset` stages with literal values.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `documents` (ids are assigned where missing)
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().map(with_id).collect()),
        }
    }
}

/// Put an `_id` first, generating one when absent.
fn with_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut out = Document::new();
    out.insert("_id", ObjectId::new());
    for (key, value) in document {
        out.insert(key, value);
    }
    out
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

fn duplicate_id(id: &Bson) -> ExecutionError {
    ExecutionError::InvalidParameters(format!("duplicate _id {id}"))
}

/// Apply one pipeline stage; returns whether the document changed.
fn apply_stage(document: &mut Document, stage: &Document) -> Result<bool> {
    let mut changed = false;
    for (operator, argument) in stage {
        match (operator.as_str(), argument) {
            ("$set" | "$addFields", Bson::Document(fields)) => {
                for (key, value) in fields {
                    if document.get(key) != Some(value) {
                        document.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
            }
            ("$unset", Bson::String(key)) => {
                changed |= document.remove(key).is_some();
            }
            ("$unset", Bson::Array(keys)) => {
                for key in keys.iter().filter_map(Bson::as_str) {
                    changed |= document.remove(key).is_some();
                }
            }
            _ => {
                return Err(ExecutionError::UnsupportedOperation(format!(
                    "pipeline stage {operator} in memory store"
                ))
                .into());
            }
        }
    }
    Ok(changed)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<i32> {
        Ok(1)
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().await.clone())
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>> {
        self.find_by_value(id.filter()).await
    }

    async fn find_by_value(&self, filter: Document) -> Result<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|d| matches(d, &filter)).cloned())
    }

    async fn insert_one(&self, document: Document) -> Result<InsertOneOutcome> {
        let document = with_id(document);
        let inserted_id = document.get("_id").cloned().unwrap_or(Bson::Null);

        let mut documents = self.documents.write().await;
        if documents.iter().any(|d| d.get("_id") == Some(&inserted_id)) {
            return Err(duplicate_id(&inserted_id).into());
        }
        documents.push(document);
        Ok(InsertOneOutcome { inserted_id })
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<InsertManyOutcome> {
        let batch: Vec<Document> = documents.into_iter().map(with_id).collect();
        let ids: Vec<Bson> = batch
            .iter()
            .map(|d| d.get("_id").cloned().unwrap_or(Bson::Null))
            .collect();

        let mut stored = self.documents.write().await;
        // All or nothing: check every id before writing any.
        for (i, id) in ids.iter().enumerate() {
            let clash = ids[..i].contains(id) || stored.iter().any(|d| d.get("_id") == Some(id));
            if clash {
                return Err(duplicate_id(id).into());
            }
        }
        stored.extend(batch);
        debug!("Inserted {} document(s) in memory", ids.len());
        Ok(InsertManyOutcome { inserted_ids: ids })
    }

    async fn update_one(&self, document: Document) -> Result<UpdateOutcome> {
        let (id, update) = set_by_id(document)?;
        let mut documents = self.documents.write().await;

        let Some(target) = documents.iter_mut().find(|d| d.get("_id") == Some(&id)) else {
            return Ok(UpdateOutcome::default());
        };
        let changed = apply_stage(target, &update)?;

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
        })
    }

    async fn update_many(&self, stages: Vec<Document>) -> Result<UpdateOutcome> {
        if stages.is_empty() {
            return Err(ExecutionError::InvalidParameters(
                "updateMany needs at least one pipeline stage".to_string(),
            )
            .into());
        }

        let mut documents = self.documents.write().await;
        // Work on a copy so an unsupported stage leaves the store untouched.
        let mut updated = documents.clone();
        let mut modified = 0;
        for document in updated.iter_mut() {
            let mut changed = false;
            for stage in &stages {
                changed |= apply_stage(document, stage)?;
            }
            modified += u64::from(changed);
        }

        let matched = updated.len() as u64;
        *documents = updated;
        Ok(UpdateOutcome { matched, modified })
    }

    async fn delete_one(&self, id: &DocumentId) -> Result<DeleteOutcome> {
        let filter = id.filter();
        let mut documents = self.documents.write().await;
        match documents.iter().position(|d| matches(d, &filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(DeleteOutcome { deleted: 1 })
            }
            None => Ok(DeleteOutcome::default()),
        }
    }

    async fn clear(&self) -> Result<DeleteOutcome> {
        let mut documents = self.documents.write().await;
        warn!("Clearing {} document(s) from memory store", documents.len());
        let deleted = documents.len() as u64;
        documents.clear();
        Ok(DeleteOutcome { deleted })
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.documents.read().await.len() as u64)
    }
}
