//! Document identifiers.

use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, doc};

use crate::error::{MongoCurryError, ValidationError};

/// Identifier of a single document (`_id`), backed by an `ObjectId`.
///
/// Built from the 24-character hex form; two ids are equal when their
/// underlying `ObjectId`s are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parse the hex form.
    pub fn parse(s: &str) -> Result<Self, MongoCurryError> {
        ObjectId::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(s.to_string()).into())
    }

    /// The id stored in a document's `_id` field, if it is an `ObjectId`.
    pub fn of(document: &Document) -> Option<Self> {
        document.get_object_id("_id").ok().map(Self)
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    /// `{ _id: <id> }`
    pub fn filter(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for DocumentId {
    type Err = MongoCurryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for DocumentId {
    type Error = MongoCurryError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = MongoCurryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Bson::ObjectId(id.0)
    }
}
