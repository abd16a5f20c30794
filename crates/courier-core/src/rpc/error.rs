//! Error types for request-response operations.

use std::time::Duration;

use thiserror::Error;

use crate::typed::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// No matching response within the call window. The only non-response failure.
    #[error("{request_type} timed out after {after:?}")]
    Timeout {
        request_type: String,
        after: Duration,
    },

    /// The remote handler rejected the request.
    #[error("{request_type} failed: {message}")]
    Remote {
        request_type: String,
        message: String,
    },

    #[error("a handler for request type '{0}' is already registered")]
    DuplicateHandler(String),

    /// The endpoint was shut down while the call was pending.
    #[error("rpc channel closed")]
    Closed,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<RegistryError> for RpcError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::AlreadyRegistered(t) => RpcError::DuplicateHandler(t),
        }
    }
}
