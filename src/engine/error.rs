//! Shared error vocabulary. Every component returns through `EngineError` so the
//! JSON-RPC layer can map a single enum to wire error codes instead of
//! re-deriving error kinds per method.

use std::fmt;

/// The kinds enumerated in the error handling design: one per distinguishable
/// failure mode a caller (or the transport) needs to react to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidQuerySyntax,
    InvalidField,
    InvalidRange,
    NotFound,
    IndexUnavailable,
    SchemaMismatch,
    TransientIo,
}

#[derive(Debug, Clone)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn invalid_query_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuerySyntax, message)
    }

    pub fn invalid_field(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidField, message)
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRange, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexUnavailable, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    pub fn transient_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientIo, message)
    }

    /// JSON-RPC 2.0 error code for this kind (spec.md §7).
    pub fn rpc_code(&self) -> i64 {
        match self.kind {
            ErrorKind::InvalidArgument
            | ErrorKind::InvalidQuerySyntax
            | ErrorKind::InvalidField
            | ErrorKind::InvalidRange => -32602,
            ErrorKind::NotFound => -32001,
            ErrorKind::IndexUnavailable => -32002,
            ErrorKind::SchemaMismatch => -32003,
            ErrorKind::TransientIo => -32004,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock => {
                EngineError::transient_io(e.to_string())
            }
            std::io::ErrorKind::NotFound => EngineError::not_found(e.to_string()),
            _ => EngineError::index_unavailable(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::invalid_argument(e.to_string())
    }
}

impl From<serde_yaml::Error> for EngineError {
    fn from(e: serde_yaml::Error) -> Self {
        EngineError::invalid_argument(format!("config: {e}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A non-fatal marker attached to an otherwise successful response: the query
/// deadline was exceeded, or the extractor failed on part of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Partial(pub bool);
