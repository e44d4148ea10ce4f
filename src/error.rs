//! Shared error kinds for the table-node core.
//!
//! Every failure mode named in the design (codec, parameter, space,
//! strategy, lookup, serialization) gets its own variant so the API layer
//! can map it to an HTTP status without re-inspecting a message string.

use thiserror::Error;

/// A malformed or mistyped scalar/vector payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed {value_type} literal: {payload:?}")]
    Malformed { value_type: &'static str, payload: String },
    #[error("value type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },
}

/// A bad argument to a core operation (bad slice arity, double receipt, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParameterError(pub String);

impl ParameterError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The aligned-space structural invariant (lower-filling, infinite-axis
/// placement) was violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidSpaceError(pub String);

impl InvalidSpaceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An unknown strategy/type discriminator was requested at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {discriminator:?}")]
pub struct TypeError {
    pub kind: &'static str,
    pub discriminator: String,
}

impl TypeError {
    pub fn new(kind: &'static str, discriminator: impl Into<String>) -> Self {
        Self { kind, discriminator: discriminator.into() }
    }
}

/// A study or trial could not be found by the given key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("not found: {0}")]
pub struct NotFoundError(pub String);

/// The persisted snapshot could not be read, parsed, or written.
#[derive(Debug, Error)]
#[error("snapshot serialization failed: {0}")]
pub struct SerializationError(pub String);

impl From<serde_json::Error> for SerializationError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// The union of everything the core can fail with, used at module
/// boundaries that can raise more than one kind.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    InvalidSpace(#[from] InvalidSpaceError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl CoreError {
    /// The HTTP status this error maps to at the coordinator API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Codec(_) => 400,
            CoreError::Parameter(_) => 400,
            CoreError::InvalidSpace(_) => 400,
            CoreError::Type(_) => 400,
            CoreError::NotFound(_) => 404,
            CoreError::Serialization(_) => 500,
        }
    }
}
