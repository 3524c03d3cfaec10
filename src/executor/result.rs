//! Operation outcome types
//!
//! Typed descriptors returned by the write operations:
//! - InsertOneOutcome / InsertManyOutcome: generated identifiers
//! - UpdateOutcome: matched and modified counts
//! - DeleteOutcome: deleted count

use mongodb::bson::Bson;
use mongodb::results::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};

use crate::id::DocumentId;

/// Result of inserting one document
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneOutcome {
    /// `_id` of the inserted document
    pub inserted_id: Bson,
}

/// Result of inserting a batch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertManyOutcome {
    /// `_id`s in input order
    pub inserted_ids: Vec<Bson>,
}

/// Result of an update
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,

    /// Documents actually changed
    pub modified: u64,
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteOutcome {
    /// Documents removed
    pub deleted: u64,
}

impl InsertOneOutcome {
    /// The inserted id, when it is an `ObjectId`
    pub fn id(&self) -> Option<DocumentId> {
        match &self.inserted_id {
            Bson::ObjectId(oid) => Some(DocumentId::from(*oid)),
            _ => None,
        }
    }
}

impl InsertManyOutcome {
    pub fn len(&self) -> usize {
        self.inserted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_ids.is_empty()
    }
}

impl From<InsertOneResult> for InsertOneOutcome {
    fn from(result: InsertOneResult) -> Self {
        Self {
            inserted_id: result.inserted_id,
        }
    }
}

impl From<InsertManyResult> for InsertManyOutcome {
    fn from(result: InsertManyResult) -> Self {
        let mut indexed: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        Self {
            inserted_ids: indexed.into_iter().map(|(_, id)| id).collect(),
        }
    }
}

impl From<UpdateResult> for UpdateOutcome {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched: result.matched_count,
            modified: result.modified_count,
        }
    }
}

impl From<DeleteResult> for DeleteOutcome {
    fn from(result: DeleteResult) -> Self {
        Self {
            deleted: result.deleted_count,
        }
    }
}
