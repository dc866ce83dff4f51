//! Error types for QAIL views.

use thiserror::Error;

/// The main error type for view diffing and view operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The connection's dialect has no view reflection support.
    #[error("Unsupported dialect for view reflection: {0}")]
    UnsupportedDialect(String),

    /// Reversing an operation that was never given its prior definition.
    #[error("Cannot reverse {op} of view '{name}': no old definition was captured")]
    MissingReversalState { op: &'static str, name: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failed to parse a migration script.
    #[error("Script error at position {position}: {message}")]
    Script { position: usize, message: String },

    /// A script called an operation nobody registered.
    #[error("Unknown operation: '{0}'")]
    UnknownOperation(String),

    /// A registered operation was called with bad arguments.
    #[error("Invalid arguments for {op}: {message}")]
    InvalidArgument { op: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewError {
    /// Create a script error at the given position.
    pub fn script(position: usize, message: impl Into<String>) -> Self {
        Self::Script {
            position,
            message: message.into(),
        }
    }

    /// Create a missing reversal state error.
    pub fn missing_old_definition(op: &'static str, name: impl Into<String>) -> Self {
        Self::MissingReversalState {
            op,
            name: name.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op: op.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for ViewError {
    fn from(err: sqlx::Error) -> Self {
        ViewError::Database(err.to_string())
    }
}

/// Result type alias for view operations.
pub type ViewResult<T> = Result<T, ViewError>;
