//! Raw message parsing: wire text to request envelopes.
//!
//! Parsing only separates a single message from a batch and splits each
//! request object into its members. Whether those members form a valid
//! request is decided by the classifier.

use serde_json::{Map, Value};
use std::fmt;

/// Members of one request object, before any validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEnvelope {
    pub(crate) is_object: bool,
    pub(crate) jsonrpc: Option<Value>,
    pub(crate) method: Option<Value>,
    /// `None` when the member is absent, `Some(Value::Null)` for `"id": null`
    pub(crate) id: Option<Value>,
    pub(crate) params: Option<Value>,
}

impl RawEnvelope {
    /// Split a JSON value into request members
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Self::default(),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Self {
        Self {
            is_object: true,
            jsonrpc: map.remove("jsonrpc"),
            method: map.remove("method"),
            id: map.remove("id"),
            params: map.remove("params"),
        }
    }

    pub fn is_object(&self) -> bool {
        self.is_object
    }

    /// Method name, when the member is a string
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().and_then(Value::as_str)
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }
}

/// A parsed payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(RawEnvelope),
    Batch(Vec<RawEnvelope>),
}

impl Payload {
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }
}

/// Why a payload could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The text is not JSON
    InvalidJson(String),
    /// The JSON is neither a request object nor a non-empty array
    InvalidStructure(String),
}

impl ParseFailure {
    pub fn reason(&self) -> &str {
        match self {
            ParseFailure::InvalidJson(reason) => reason,
            ParseFailure::InvalidStructure(reason) => reason,
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::InvalidJson(reason) => write!(f, "invalid JSON: {}", reason),
            ParseFailure::InvalidStructure(reason) => write!(f, "invalid message: {}", reason),
        }
    }
}

/// Parse wire text into a single envelope or a batch
pub fn parse_payload(text: &str) -> Result<Payload, ParseFailure> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    parse_value(value)
}

/// Parse wire bytes; they must be UTF-8
pub fn parse_payload_slice(bytes: &[u8]) -> Result<Payload, ParseFailure> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    parse_value(value)
}

fn parse_value(value: Value) -> Result<Payload, ParseFailure> {
    match value {
        Value::Object(map) => Ok(Payload::Single(RawEnvelope::from_map(map))),
        Value::Array(items) if items.is_empty() => Err(ParseFailure::InvalidStructure(
            "batch must contain at least one request".to_string(),
        )),
        Value::Array(items) => Ok(Payload::Batch(
            items.into_iter().map(RawEnvelope::from_value).collect(),
        )),
        other => Err(ParseFailure::InvalidStructure(format!(
            "expected an object or an array, found {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single() {
        let payload = parse_payload(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}"#)
            .unwrap();
        assert!(!payload.is_batch());
        match payload {
            Payload::Single(envelope) => {
                assert!(envelope.is_object());
                assert_eq!(envelope.method_name(), Some("add"));
                assert_eq!(envelope.id, Some(json!(1)));
                assert_eq!(envelope.params, Some(json!([1, 2])));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_parse_distinguishes_null_and_absent_id() {
        let Payload::Single(with_null) = parse_payload(r#"{"method":"m","id":null}"#).unwrap()
        else {
            panic!("expected single");
        };
        assert_eq!(with_null.id, Some(Value::Null));
        assert!(with_null.has_id());

        let Payload::Single(without) = parse_payload(r#"{"method":"m"}"#).unwrap() else {
            panic!("expected single");
        };
        assert_eq!(without.id, None);
        assert!(!without.has_id());
    }

    #[test]
    fn test_parse_batch_keeps_non_objects() {
        let payload = parse_payload(r#"[{"method":"a"}, 1, "x"]"#).unwrap();
        let Payload::Batch(items) = payload else {
            panic!("expected batch");
        };
        assert_eq!(items.len(), 3);
        assert!(items[0].is_object());
        assert!(!items[1].is_object());
        assert!(!items[2].is_object());
    }

    #[test]
    fn test_parse_invalid_json() {
        let failure = parse_payload(r#"{"method": "#).unwrap_err();
        assert!(matches!(failure, ParseFailure::InvalidJson(_)));
        assert!(failure.to_string().starts_with("invalid JSON"));
    }

    #[test]
    fn test_parse_empty_batch() {
        let failure = parse_payload("[]").unwrap_err();
        assert!(matches!(failure, ParseFailure::InvalidStructure(_)));
    }

    #[test]
    fn test_parse_scalar() {
        for text in ["1", "\"text\"", "null", "true"] {
            let failure = parse_payload(text).unwrap_err();
            assert!(matches!(failure, ParseFailure::InvalidStructure(_)), "{}", text);
        }
    }

    #[test]
    fn test_parse_slice_rejects_invalid_utf8() {
        let failure = parse_payload_slice(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(failure, ParseFailure::InvalidJson(_)));
        assert!(parse_payload_slice(br#"{"method":"m"}"#).is_ok());
    }
}
