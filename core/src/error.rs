//! Error types for the Trello client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because a stale or mistyped id is the
//! expected failure of a lookup, and callers branch on it. All other non-2xx
//! responses land in `Remote` with the raw status code and body. Transport,
//! authentication and remote failures stay distinct from the object-model
//! failures (`Conflict`, `InvalidField`, ...) raised by this crate itself.

use serde_json::Value;
use thiserror::Error;

use crate::types::{ResourceId, ResourceKind};

/// A dirty local field that a remote re-fetch tried to overwrite.
///
/// The local value is kept; `remote` is what the server returned.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConflict {
    pub kind: ResourceKind,
    pub id: ResourceId,
    pub field: String,
    pub local: Value,
    pub remote: Value,
}

/// Errors returned by every fallible operation of the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect failure, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Credentials are missing or were rejected by the server.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server returned 404, or rejected the id as invalid.
    #[error("resource not found: {endpoint}")]
    NotFound { endpoint: String },

    /// The server returned a non-2xx status other than the ones above.
    #[error("HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// A re-fetch would have overwritten unsaved local edits.
    #[error("{} dirty field(s) conflict with remote values", .0.len())]
    Conflict(Vec<FieldConflict>),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A known field carried a value of the wrong JSON type.
    #[error("{kind}.{field}: expected {expected}")]
    InvalidField {
        kind: ResourceKind,
        field: String,
        expected: &'static str,
    },

    /// A caller-supplied value was rejected before any request was made.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The remote API does not offer this operation for this kind.
    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        kind: ResourceKind,
        operation: &'static str,
    },

    /// The endpoint needs a parent id that the object does not carry.
    #[error("{kind} {id} needs its {parent} to build a request")]
    MissingParent {
        kind: ResourceKind,
        id: ResourceId,
        parent: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A blocking twin was called from inside an async runtime.
    #[error("blocking call made from within an async runtime; use the async operation")]
    BlockingInAsyncContext,

    /// The runtime backing the blocking twins could not be started.
    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Deserialization(err.to_string())
    }
}
