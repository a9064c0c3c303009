//! Error types for the node engine

use thiserror::Error;

use crate::value::ValueType;

/// Result type alias using NodeError
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors that can occur while translating or handling node commands
///
/// None of these terminate a node instance: they are reported on the
/// node's `error` port and the instance keeps accepting commands.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Value read as the wrong shape
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ValueType,
    },

    /// Unsafe numeric coercion
    #[error("{0}")]
    RangeOrPrecision(String),

    /// Tuple lookup failed
    #[error("missing tuple field '{0}'")]
    MissingField(String),

    /// Command not valid for the current machine state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Failure reported by an underlying native resource
    #[error("{0}")]
    Resource(String),

    /// I/O error from a native file handle
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Out-of-range configuration or malformed argument
    #[error("{0}")]
    Validation(String),

    /// A command handler panicked; the drain went on with the next command
    #[error("command handler panicked: {0}")]
    HandlerPanicked(String),

    /// No factory registered for the requested node type
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// Engine configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NodeError {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: &'static str, found: ValueType) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create an invalid state error with a message
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a resource error with a message
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Create a validation error with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap an I/O error with the operation that failed
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
