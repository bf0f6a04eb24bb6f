//! Builder patterns for JSON-RPC types.

use crate::types::*;
use serde_json::Value;

/// Builder for requests and notifications
pub struct RequestBuilder {
    method: String,
    params: Params,
    id: Option<RequestId>,
}

impl RequestBuilder {
    /// Create a new request builder
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::None,
            id: None,
        }
    }

    /// Pass parameters by position
    pub fn positional(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.params = Params::Positional(values.into_iter().collect());
        self
    }

    /// Pass a single parameter by name
    pub fn named(mut self, name: impl Into<String>, value: Value) -> Self {
        let mut map = match self.params {
            Params::Named(map) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(name.into(), value);
        self.params = Params::Named(map);
        self
    }

    /// Set the request id; without one the request is a notification
    pub fn id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            params: self.params,
            id: self.id,
        }
    }
}

/// Builder for responses
#[derive(Default)]
pub struct ResponseBuilder {
    result: Option<Value>,
    error: Option<Error>,
    id: Option<RequestId>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a response that answers `request`, carrying its id
    pub fn reply_to(request: &Request) -> Self {
        Self::new().id(request.id.clone())
    }

    /// Set successful result
    pub fn success(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Set error; it takes precedence over a result
    pub fn error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Set response id
    pub fn id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    /// Build the response; a missing result becomes `null`
    pub fn build(self) -> Response {
        match self.error {
            Some(error) => Response::error(self.id, error),
            None => Response::result(self.id, self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Builder for error objects
pub struct ErrorBuilder {
    code: i32,
    message: String,
    data: Option<Value>,
}

impl ErrorBuilder {
    /// Create a new error builder
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add additional error data
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn build(self) -> Error {
        Error {
            code: self.code,
            message: self.message,
            data: self.data,
        }
    }
}
