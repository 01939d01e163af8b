//! Error types for sqlmold

use thiserror::Error;

/// Result type alias for sqlmold operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query execution, binding and eager loading
#[derive(Debug, Error)]
pub enum OrmError {
    /// Driver error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A strict singular bind received more than one row
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// A result value could not be stored into its target field
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Column-to-field mapping could not be resolved
    #[error("Binding error: {0}")]
    Binding(String),

    /// Relationship registry or loader is missing for a requested path
    #[error("Configuration error: {0}")]
    Config(String),

    /// Executor failure, wrapped with the operation that issued it
    #[error("{op}: {source}")]
    Exec {
        op: &'static str,
        #[source]
        source: Box<OrmError>,
    },

    /// A relationship loader failed
    #[error("failed to eager load {relationship}: {source}")]
    EagerLoad {
        relationship: String,
        #[source]
        source: Box<OrmError>,
    },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a binding error
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap this error with the name of the operation that produced it.
    ///
    /// `NotFound` passes through untouched so callers can match on it directly.
    pub fn in_op(self, op: &'static str) -> Self {
        match self {
            Self::NotFound(_) | Self::Exec { .. } => self,
            other => Self::Exec {
                op,
                source: Box::new(other),
            },
        }
    }

    /// Wrap a loader error with the relationship it was loading.
    pub fn in_relationship(self, relationship: impl Into<String>) -> Self {
        Self::EagerLoad {
            relationship: relationship.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a not found error, looking through operation wrapping
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Exec { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Exec { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Check if this is a binding or configuration error (never worth retrying)
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Binding(_) | Self::Config(_) => true,
            Self::Exec { source, .. } | Self::EagerLoad { source, .. } => {
                source.is_configuration()
            }
            _ => false,
        }
    }

    /// Convert a tokio_postgres error
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        Self::Query(err)
    }
}
