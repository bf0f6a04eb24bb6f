//! Error types raised by the dispatch core itself.
//!
//! These are distinct from JSON-RPC error objects ([`crate::Error`]): a
//! `ConfigurationError` stops a handler from being hosted at all, and a
//! `ProcessError` aborts one message without producing any response.

use crate::types::RequestId;
use thiserror::Error;

/// Boxed failure a handler reports outside of the JSON-RPC error channel
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid method registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("method name must not be empty")]
    EmptyMethodName,

    #[error("method name '{0}' uses the reserved 'rpc.' prefix")]
    ReservedMethodName(String),

    #[error("method '{0}' is already registered")]
    DuplicateMethod(String),
}

/// Handler response that breaks protocol invariants
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolViolation {
    #[error("handler for '{method}' answered with id {actual} instead of {expected}", expected = display_id(.expected), actual = display_id(.actual))]
    ResponseIdMismatch {
        method: String,
        expected: Option<RequestId>,
        actual: Option<RequestId>,
    },

    #[error("handler for '{method}' used reserved error code {code}")]
    ReservedErrorCode { method: String, code: i32 },
}

impl ProtocolViolation {
    pub fn method(&self) -> &str {
        match self {
            ProtocolViolation::ResponseIdMismatch { method, .. } => method,
            ProtocolViolation::ReservedErrorCode { method, .. } => method,
        }
    }
}

fn display_id(id: &Option<RequestId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "<absent>".to_string(),
    }
}

/// Failure that aborts processing of a whole message
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error("handler for '{method}' failed: {source}")]
    Handler {
        method: String,
        #[source]
        source: HandlerFault,
    },

    #[error("message processing was cancelled")]
    Cancelled,
}

impl ProcessError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled)
    }
}
