//! Core JSON-RPC 2.0 types and data structures.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Protocol version carried by every response
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier - string, number, or null
///
/// Equality is by variant and value, so `Integer(1)` and `Float(1.0)` are
/// distinct identifiers. Floats compare by their bit pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl RequestId {
    /// Convert a wire value into an identifier.
    ///
    /// Returns `None` for values that cannot be identifiers (booleans, arrays, objects).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(RequestId::Null),
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RequestId::Integer(i)),
                None => n.as_f64().map(RequestId::Float),
            },
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }
}

impl PartialEq for RequestId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RequestId::Integer(a), RequestId::Integer(b)) => a == b,
            (RequestId::Float(a), RequestId::Float(b)) => a.to_bits() == b.to_bits(),
            (RequestId::String(a), RequestId::String(b)) => a == b,
            (RequestId::Null, RequestId::Null) => true,
            _ => false,
        }
    }
}

impl Eq for RequestId {}

impl Hash for RequestId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RequestId::Integer(i) => i.hash(state),
            RequestId::Float(f) => f.to_bits().hash(state),
            RequestId::String(s) => s.hash(state),
            RequestId::Null => {}
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Integer(i) => write!(f, "{}", i),
            RequestId::Float(v) => write!(f, "{}", v),
            RequestId::String(s) => write!(f, "\"{}\"", s),
            RequestId::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Integer(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::String(value)
    }
}

/// Parameters of a classified request, already checked against the method contract
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Params {
    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(map) => map.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    /// Get a positional parameter
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Params::Positional(values) => values.get(index),
            _ => None,
        }
    }

    /// Get a named parameter
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        match self {
            Params::Named(map) => map.get(name),
            _ => None,
        }
    }

    /// Convert back to the wire representation
    pub fn into_value(self) -> Option<Value> {
        match self {
            Params::None => None,
            Params::Positional(values) => Some(Value::Array(values)),
            Params::Named(map) => Some(Value::Object(map)),
        }
    }

    /// Deserialize the parameters into a typed value.
    ///
    /// Positional parameters deserialize into tuples or sequences, named parameters
    /// into structs or maps, and absent parameters into `()`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value().unwrap_or(Value::Null))
    }
}

/// JSON-RPC 2.0 request that passed classification
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Params,
    pub id: Option<RequestId>,
}

impl Request {
    /// Create a new request without parameters or id
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::None,
            id: None,
        }
    }

    /// Add parameters to the request
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Add an ID to the request
    pub fn with_id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check if this is a notification (no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Take ownership of the parameters
    pub fn take_params(self) -> Params {
        self.params
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// Result or error carried by a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    Result(Value),
    Error(Error),
}

/// JSON-RPC 2.0 response message
///
/// An absent id is written as `null` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub payload: ResponsePayload,
    pub id: Option<RequestId>,
}

impl Response {
    /// Create a successful response
    pub fn result(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            payload: ResponsePayload::Result(result),
            id,
        }
    }

    /// Create an error response
    pub fn error(id: Option<RequestId>, error: Error) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            payload: ResponsePayload::Error(error),
            id,
        }
    }

    /// Create an error response for a standard error kind
    pub fn standard(id: Option<RequestId>, kind: StandardErrorKind) -> Self {
        Self::error(id, Error::from_kind(kind))
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, ResponsePayload::Result(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }

    pub fn result_value(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    pub fn error_info(&self) -> Option<&Error> {
        match &self.payload {
            ResponsePayload::Error(error) => Some(error),
            ResponsePayload::Result(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error_info().map(Error::code)
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create the fixed error object for a standard error kind
    pub fn from_kind(kind: StandardErrorKind) -> Self {
        Self::new(kind.code(), kind.message())
    }

    /// Add additional data to the error
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Check if the code belongs to the protocol core and must not come from a handler
    pub fn is_reserved(&self) -> bool {
        error_codes::is_reserved(self.code)
    }
}

/// Error codes assigned by the dispatch core.
///
/// Handlers may answer with `INVALID_PARAMETERS`; every other code in this
/// module is reserved and rejected when a handler produces it.
pub mod error_codes {
    /// The payload is not valid JSON.
    pub const INVALID_FORMAT: i32 = -32700;

    /// The payload is valid JSON but not a JSON-RPC message.
    pub const INVALID_OPERATION: i32 = -32603;

    /// The method is not registered.
    pub const INVALID_METHOD: i32 = -32601;

    /// The parameters do not satisfy the method contract.
    pub const INVALID_PARAMETERS: i32 = -32602;

    /// A batch item or single message is not a valid request object.
    pub const INVALID_MESSAGE: i32 = -32600;

    /// Two requests in one batch share an identifier.
    pub const BATCH_DUPLICATE_IDENTIFIERS: i32 = -32000;

    /// Codes a handler must never put into an error response
    pub const RESERVED: [i32; 5] = [
        INVALID_FORMAT,
        INVALID_OPERATION,
        INVALID_METHOD,
        INVALID_MESSAGE,
        BATCH_DUPLICATE_IDENTIFIERS,
    ];

    pub fn is_reserved(code: i32) -> bool {
        RESERVED.contains(&code)
    }
}

/// Protocol-level failure categories, independent of any handler's business errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardErrorKind {
    InvalidFormat,
    InvalidOperation,
    InvalidMethod,
    InvalidParameters,
    InvalidMessage,
    BatchDuplicateIdentifiers,
}

impl StandardErrorKind {
    pub const ALL: [StandardErrorKind; 6] = [
        StandardErrorKind::InvalidFormat,
        StandardErrorKind::InvalidOperation,
        StandardErrorKind::InvalidMethod,
        StandardErrorKind::InvalidParameters,
        StandardErrorKind::InvalidMessage,
        StandardErrorKind::BatchDuplicateIdentifiers,
    ];

    pub fn code(self) -> i32 {
        match self {
            StandardErrorKind::InvalidFormat => error_codes::INVALID_FORMAT,
            StandardErrorKind::InvalidOperation => error_codes::INVALID_OPERATION,
            StandardErrorKind::InvalidMethod => error_codes::INVALID_METHOD,
            StandardErrorKind::InvalidParameters => error_codes::INVALID_PARAMETERS,
            StandardErrorKind::InvalidMessage => error_codes::INVALID_MESSAGE,
            StandardErrorKind::BatchDuplicateIdentifiers => {
                error_codes::BATCH_DUPLICATE_IDENTIFIERS
            }
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            StandardErrorKind::InvalidFormat => "The payload is not valid JSON",
            StandardErrorKind::InvalidOperation => {
                "The payload is not a valid JSON-RPC message"
            }
            StandardErrorKind::InvalidMethod => "The method does not exist or is not available",
            StandardErrorKind::InvalidParameters => {
                "The parameters do not match the method contract"
            }
            StandardErrorKind::InvalidMessage => {
                "The request is not a valid JSON-RPC request object"
            }
            StandardErrorKind::BatchDuplicateIdentifiers => {
                "The batch contains requests with duplicate identifiers"
            }
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn is_reserved(self) -> bool {
        error_codes::is_reserved(self.code())
    }
}

impl fmt::Display for StandardErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}
