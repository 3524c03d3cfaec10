//! Error handling for mongo-curry.
//!
//! Every fallible operation returns [`Result`], whose error side is
//! [`MongoCurryError`]. Driver errors are kept intact and rendered as
//! structured JSON when displayed.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongo_curry::error::{MongoCurryError, Result};
//!
//! fn report(result: Result<()>) {
//!     match result {
//!         Err(e) if e.is_bad_data() => eprintln!("rejected: {e}"),
//!         Err(e) => eprintln!("{e}"),
//!         Ok(()) => {}
//!     }
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, ExecutionError, MongoCurryError, Result, ValidationError,
};
pub use mongo::{ErrorDetails, ErrorInfo};
