use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("{message}")]
    ValidationError { message: String },

    #[error("{resource} not found: {id}")]
    NotFoundError { resource: &'static str, id: String },

    #[error("failed to {operation}: {source}")]
    PersistenceError {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error("object storage failed to {operation}: {source}")]
    ObjectStoreError {
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse classification used by adapters to pick a response without
/// inspecting error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
    Storage,
    Configuration,
    Internal,
}

impl TaskflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFoundError {
            resource,
            id: id.to_string(),
        }
    }

    pub fn persistence(operation: &'static str, source: RepositoryError) -> Self {
        Self::PersistenceError { operation, source }
    }

    pub fn object_store(operation: &'static str, source: StorageError) -> Self {
        Self::ObjectStoreError { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError { .. } => ErrorKind::Validation,
            Self::NotFoundError { .. } => ErrorKind::NotFound,
            Self::PersistenceError { .. } => ErrorKind::Persistence,
            Self::ObjectStoreError { .. } => ErrorKind::Storage,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorKind::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorKind::Internal,
        }
    }
}

/// Failures reported by a persistence port.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("{0}")]
    Backend(String),
}

impl From<tokio_rusqlite::Error> for RepositoryError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        match e {
            tokio_rusqlite::Error::Rusqlite(e) => Self::Sqlite(e),
            tokio_rusqlite::Error::Close(_) => Self::Connection("connection closed".to_string()),
            other => Self::Connection(other.to_string()),
        }
    }
}

/// Failures reported by a notification port.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Failures reported by an object store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, TaskflowError>;
