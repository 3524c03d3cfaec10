use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`MongoCurryError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, MongoCurryError>;

/// Top-level error type for mongo-curry operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum MongoCurryError {
    /// Configuration errors.
    Config(ConfigError),

    /// Connection-related errors.
    Connection(ConnectionError),

    /// Caller data rejected before reaching the server.
    Validation(ValidationError),

    /// Command execution errors.
    Execution(ExecutionError),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Configuration-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing (or empty) required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),
}

/// Connection-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// No lease became available before the acquire timeout.
    PoolExhausted,
}

/// Validation errors raised before any write is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The caller-supplied predicate rejected the batch.
    BadData { operation: String, count: usize },

    /// A document identifier could not be parsed.
    InvalidId(String),
}

/// Execution-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Invalid operation parameters.
    InvalidParameters(String),

    /// Operation not supported by this store.
    UnsupportedOperation(String),

    /// The operation was cancelled before it completed.
    Cancelled,
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for MongoCurryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MongoCurryError::Config(e) => write!(f, "Configuration error: {e}"),
            MongoCurryError::Connection(e) => write!(f, "Connection error: {e}"),
            MongoCurryError::Validation(e) => write!(f, "{e}"),
            MongoCurryError::Execution(e) => write!(f, "Execution error: {e}"),
            MongoCurryError::MongoDb(e) => format_mongodb_error(f, e),
            MongoCurryError::Io(e) => write!(f, "I/O error: {e}"),
            MongoCurryError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(field) => {
                write!(f, "{field} is required but is not defined")
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PoolExhausted => write!(f, "Connection pool exhausted"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BadData { operation, count } => {
                write!(f, "BAD DATA ({operation} rejected {count} document(s))")
            }
            ValidationError::InvalidId(id) => write!(f, "Invalid document id: {id}"),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::InvalidParameters(msg) => write!(f, "Invalid parameters: {msg}"),
            ExecutionError::UnsupportedOperation(op) => {
                write!(f, "Unsupported operation: {op}")
            }
            ExecutionError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for MongoCurryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MongoCurryError::MongoDb(e) => Some(e),
            MongoCurryError::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ConfigError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ExecutionError {}

impl MongoCurryError {
    /// Whether this error is a validation rejection (the old `"BAD DATA"` case).
    pub fn is_bad_data(&self) -> bool {
        matches!(
            self,
            MongoCurryError::Validation(ValidationError::BadData { .. })
        )
    }
}

/* ========================= Conversions to MongoCurryError ========================= */

impl From<io::Error> for MongoCurryError {
    fn from(err: io::Error) -> Self {
        MongoCurryError::Io(err)
    }
}

impl From<mongodb::error::Error> for MongoCurryError {
    fn from(err: mongodb::error::Error) -> Self {
        MongoCurryError::MongoDb(err)
    }
}

impl From<ConfigError> for MongoCurryError {
    fn from(err: ConfigError) -> Self {
        MongoCurryError::Config(err)
    }
}

impl From<ConnectionError> for MongoCurryError {
    fn from(err: ConnectionError) -> Self {
        MongoCurryError::Connection(err)
    }
}

impl From<ValidationError> for MongoCurryError {
    fn from(err: ValidationError) -> Self {
        MongoCurryError::Validation(err)
    }
}

impl From<ExecutionError> for MongoCurryError {
    fn from(err: ExecutionError) -> Self {
        MongoCurryError::Execution(err)
    }
}

impl From<String> for MongoCurryError {
    fn from(msg: String) -> Self {
        MongoCurryError::Generic(msg)
    }
}

impl From<&str> for MongoCurryError {
    fn from(msg: &str) -> Self {
        MongoCurryError::Generic(msg.to_owned())
    }
}
