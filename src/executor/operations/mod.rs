//! Built-in collection operations
//!
//! Each operation takes a resolved collection (or database, for `ping`) plus
//! its arguments and delegates to the driver. They are the operation
//! functions handed to [`CommandExecutor`](super::CommandExecutor):
//! - `read`: find_all, find_by_id, find_by_value, count_documents
//! - `write`: insert_one, insert_many, update_one, update_many, delete_one, clear_collection

use mongodb::Database;
use mongodb::bson::{Document, doc};
use tracing::debug;

use crate::connection::ok_value;
use crate::error::{Result, ValidationError};

mod read;
mod write;

pub use read::{count_documents, find_all, find_by_id, find_by_value};
pub use write::{clear_collection, delete_one, insert_many, insert_one, update_many, update_one};
pub(crate) use write::set_by_id;

/// Caller-supplied batch predicate for `insert_many` and `update_many`.
pub type Validation<'a> = &'a (dyn Fn(&[Document]) -> bool + Send + Sync);

/// A predicate that accepts every batch.
pub fn accept_all(_: &[Document]) -> bool {
    true
}

/// Reject the batch with `BadData` unless `validation` holds.
pub fn check_batch(operation: &str, items: &[Document], validation: Validation<'_>) -> Result<()> {
    if validation(items) {
        Ok(())
    } else {
        debug!("{} rejected {} document(s)", operation, items.len());
        Err(ValidationError::BadData {
            operation: operation.to_string(),
            count: items.len(),
        }
        .into())
    }
}

/// Liveness check against `database`
///
/// # Returns
/// * `Result<i32>` - The reply's `ok` value; 1 when healthy
pub async fn ping(database: &Database) -> Result<i32> {
    debug!("Pinging database '{}'", database.name());
    let reply = database.run_command(doc! { "ping": 1 }).await?;
    Ok(ok_value(&reply))
}
