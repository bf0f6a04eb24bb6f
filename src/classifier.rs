//! Request classification: raw envelope plus contract to a typed request.
//!
//! Classification never fails as a whole. Every envelope becomes either a
//! [`ClassifiedRequest::Valid`] request, whose parameters already match the
//! method contract, or a [`ClassifiedRequest::Invalid`] entry carrying the
//! standard error kind and whatever id could be recovered.

use crate::contract::{NamedParam, ParamKind, ParamShape};
use crate::envelope::{RawEnvelope, json_type_name};
use crate::registry::ContractRegistry;
use crate::types::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Request that failed classification
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRequest {
    /// Best-effort id; `None` when absent or not a valid identifier
    pub id: Option<RequestId>,
    pub kind: StandardErrorKind,
    /// Method name, when one could be read
    pub method: Option<String>,
    /// Diagnostic description
    pub reason: String,
}

impl InvalidRequest {
    fn new(id: Option<RequestId>, kind: StandardErrorKind, reason: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            method: None,
            reason: reason.into(),
        }
    }

    fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// Outcome of classifying one envelope
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedRequest {
    Valid(Request),
    Invalid(InvalidRequest),
}

impl ClassifiedRequest {
    pub fn is_valid(&self) -> bool {
        matches!(self, ClassifiedRequest::Valid(_))
    }

    /// A valid request without an id; its response is never transmitted
    pub fn is_valid_notification(&self) -> bool {
        matches!(self, ClassifiedRequest::Valid(request) if request.is_notification())
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            ClassifiedRequest::Valid(request) => request.id.as_ref(),
            ClassifiedRequest::Invalid(invalid) => invalid.id.as_ref(),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            ClassifiedRequest::Valid(request) => Some(&request.method),
            ClassifiedRequest::Invalid(invalid) => invalid.method.as_deref(),
        }
    }

    pub fn error_kind(&self) -> Option<StandardErrorKind> {
        match self {
            ClassifiedRequest::Valid(_) => None,
            ClassifiedRequest::Invalid(invalid) => Some(invalid.kind),
        }
    }
}

/// Classify an envelope against the registered contracts
pub fn classify(envelope: RawEnvelope, registry: &ContractRegistry) -> ClassifiedRequest {
    match classify_inner(envelope, registry) {
        Ok(request) => ClassifiedRequest::Valid(request),
        Err(invalid) => ClassifiedRequest::Invalid(invalid),
    }
}

fn classify_inner(
    envelope: RawEnvelope,
    registry: &ContractRegistry,
) -> Result<Request, InvalidRequest> {
    use StandardErrorKind::*;

    if !envelope.is_object {
        return Err(InvalidRequest::new(
            None,
            InvalidMessage,
            "request must be a JSON object",
        ));
    }

    let (id, id_is_valid) = match &envelope.id {
        None => (None, true),
        Some(value) => match RequestId::from_value(value) {
            Some(id) => (Some(id), true),
            None => (None, false),
        },
    };

    // An absent version member is read as 2.0; only a different value is rejected.
    match &envelope.jsonrpc {
        None => {}
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(InvalidRequest::new(
                id,
                InvalidMessage,
                format!("unsupported protocol version {}", other),
            ));
        }
    }

    if !id_is_valid {
        let found = envelope.id.as_ref().map(json_type_name).unwrap_or("nothing");
        return Err(InvalidRequest::new(
            None,
            InvalidMessage,
            format!("id must be a string, number, or null, found {}", found),
        ));
    }

    let method = match envelope.method {
        Some(Value::String(method)) => method,
        Some(other) => {
            return Err(InvalidRequest::new(
                id,
                InvalidMessage,
                format!("method must be a string, found {}", json_type_name(&other)),
            ));
        }
        None => {
            return Err(InvalidRequest::new(
                id,
                InvalidMessage,
                "the 'method' member is missing",
            ));
        }
    };

    if let Some(params) = &envelope.params
        && !(params.is_array() || params.is_object())
    {
        return Err(InvalidRequest::new(
            id,
            InvalidMessage,
            format!(
                "params must be an array or an object, found {}",
                json_type_name(params)
            ),
        )
        .with_method(method));
    }

    let Some(contract) = registry.lookup(&method) else {
        return Err(InvalidRequest::new(
            id,
            InvalidMethod,
            format!("method '{}' is not registered", method),
        )
        .with_method(method));
    };

    match bind_params(contract.shape(), envelope.params) {
        Ok(params) => Ok(Request { method, params, id }),
        Err(reason) => {
            Err(InvalidRequest::new(id, InvalidParameters, reason).with_method(method))
        }
    }
}

fn bind_params(shape: &ParamShape, params: Option<Value>) -> Result<Params, String> {
    match shape {
        ParamShape::None => match params {
            None => Ok(Params::None),
            Some(Value::Array(values)) if values.is_empty() => Ok(Params::None),
            Some(Value::Object(map)) if map.is_empty() => Ok(Params::None),
            Some(_) => Err("the method takes no parameters".to_string()),
        },
        ParamShape::Positional(kinds) => {
            let values = match params {
                None => Vec::new(),
                Some(Value::Array(values)) => values,
                Some(_) => return Err("parameters must be passed by position".to_string()),
            };
            bind_positional(kinds, values).map(Params::Positional)
        }
        ParamShape::Named(declared) => {
            let map = match params {
                None => Map::new(),
                Some(Value::Object(map)) => map,
                Some(_) => return Err("parameters must be passed by name".to_string()),
            };
            bind_named(declared, map).map(Params::Named)
        }
    }
}

fn bind_positional(kinds: &[ParamKind], values: Vec<Value>) -> Result<Vec<Value>, String> {
    if values.len() != kinds.len() {
        return Err(format!(
            "expected {} parameters, found {}",
            kinds.len(),
            values.len()
        ));
    }

    for (position, (kind, value)) in kinds.iter().zip(&values).enumerate() {
        if !kind.accepts(value) {
            return Err(format!(
                "parameter {} must be {}, found {}",
                position,
                kind,
                json_type_name(value)
            ));
        }
    }

    Ok(values)
}

// Extra keys are not part of the contract and pass through unchecked.
fn bind_named(
    declared: &BTreeMap<String, NamedParam>,
    mut map: Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    for (name, param) in declared {
        match map.get(name) {
            Some(value) if param.kind().accepts(value) => {}
            Some(value) => {
                return Err(format!(
                    "parameter '{}' must be {}, found {}",
                    name,
                    param.kind(),
                    json_type_name(value)
                ));
            }
            None => match param.default_value() {
                Some(default) => {
                    map.insert(name.clone(), default.clone());
                }
                None => return Err(format!("parameter '{}' is missing", name)),
            },
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MethodContract;
    use crate::envelope::{Payload, parse_payload};
    use serde_json::json;

    fn registry() -> ContractRegistry {
        ContractRegistry::from_contracts([
            ("ping", MethodContract::no_params()),
            (
                "add",
                MethodContract::positional([ParamKind::Integer, ParamKind::Integer]),
            ),
            (
                "scale",
                MethodContract::positional([ParamKind::Float, ParamKind::Float]),
            ),
            (
                "greet",
                MethodContract::named_with([
                    ("name", NamedParam::required(ParamKind::String)),
                    (
                        "greeting",
                        NamedParam::optional(ParamKind::String, json!("Hello")),
                    ),
                ]),
            ),
        ])
        .unwrap()
    }

    fn classify_text(text: &str) -> ClassifiedRequest {
        match parse_payload(text).unwrap() {
            Payload::Single(envelope) => classify(envelope, &registry()),
            Payload::Batch(_) => panic!("expected a single message"),
        }
    }

    fn expect_invalid(text: &str) -> InvalidRequest {
        match classify_text(text) {
            ClassifiedRequest::Invalid(invalid) => invalid,
            ClassifiedRequest::Valid(request) => panic!("unexpectedly valid: {:?}", request),
        }
    }

    fn expect_valid(text: &str) -> Request {
        match classify_text(text) {
            ClassifiedRequest::Valid(request) => request,
            ClassifiedRequest::Invalid(invalid) => panic!("unexpectedly invalid: {:?}", invalid),
        }
    }

    #[test]
    fn test_valid_positional_request() {
        let request = expect_valid(r#"{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}"#);
        assert_eq!(request.method(), "add");
        assert_eq!(request.id(), Some(&RequestId::Integer(1)));
        assert_eq!(request.params(), &Params::Positional(vec![json!(2), json!(3)]));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_notification_flag() {
        let classified = classify_text(r#"{"jsonrpc":"2.0","method":"add","params":[1,1]}"#);
        assert!(classified.is_valid_notification());
        assert_eq!(classified.id(), None);

        let classified = classify_text(r#"{"jsonrpc":"2.0","method":"add","params":[1,1],"id":null}"#);
        assert!(classified.is_valid());
        assert!(!classified.is_valid_notification());
        assert_eq!(classified.id(), Some(&RequestId::Null));
    }

    #[test]
    fn test_positional_arity_mismatch() {
        for params in ["[]", "[2]", "[1,2,3]"] {
            let text = format!(r#"{{"jsonrpc":"2.0","method":"add","params":{},"id":1}}"#, params);
            let invalid = expect_invalid(&text);
            assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
            assert_eq!(invalid.id, Some(RequestId::Integer(1)));
            assert_eq!(invalid.method.as_deref(), Some("add"));
        }
    }

    #[test]
    fn test_positional_absent_params() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
    }

    #[test]
    fn test_positional_kind_mismatch() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":[1,"2"],"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
        assert!(invalid.reason.contains("parameter 1"));

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":[1.5,2],"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
    }

    #[test]
    fn test_positional_widening() {
        let request = expect_valid(r#"{"jsonrpc":"2.0","method":"scale","params":[2,0.5],"id":1}"#);
        assert_eq!(request.params().len(), 2);
    }

    #[test]
    fn test_positional_rejects_named_params() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":{"a":1,"b":2},"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
    }

    #[test]
    fn test_no_params_contract() {
        expect_valid(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#);
        expect_valid(r#"{"jsonrpc":"2.0","method":"ping","params":[],"id":1}"#);
        expect_valid(r#"{"jsonrpc":"2.0","method":"ping","params":{},"id":1}"#);

        for params in ["[1]", r#"{"a":1}"#, "[null]"] {
            let text = format!(r#"{{"jsonrpc":"2.0","method":"ping","params":{},"id":1}}"#, params);
            assert_eq!(expect_invalid(&text).kind, StandardErrorKind::InvalidParameters);
        }
    }

    #[test]
    fn test_named_params_with_default() {
        let request = expect_valid(r#"{"jsonrpc":"2.0","method":"greet","params":{"name":"Ada"},"id":"g"}"#);
        assert_eq!(request.params().get_named("name"), Some(&json!("Ada")));
        assert_eq!(request.params().get_named("greeting"), Some(&json!("Hello")));
    }

    #[test]
    fn test_named_params_extra_keys_pass_through() {
        let request = expect_valid(
            r#"{"jsonrpc":"2.0","method":"greet","params":{"name":"Ada","greeting":"Hi","extra":1},"id":1}"#,
        );
        assert_eq!(request.params().get_named("greeting"), Some(&json!("Hi")));
        assert_eq!(request.params().get_named("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_named_params_missing_required() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"greet","params":{"greeting":"Hi"},"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
        assert!(invalid.reason.contains("'name'"));

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"greet","id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
    }

    #[test]
    fn test_named_params_wrong_kind_or_shape() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"greet","params":{"name":5},"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"greet","params":["Ada"],"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidParameters);
    }

    #[test]
    fn test_unknown_method() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"subtract","params":[1,2],"id":9}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMethod);
        assert_eq!(invalid.id, Some(RequestId::Integer(9)));
        assert_eq!(invalid.method.as_deref(), Some("subtract"));
    }

    #[test]
    fn test_invalid_message_recovers_id() {
        let invalid = expect_invalid(r#"{"jsonrpc":"1.0","method":"add","params":[1,2],"id":"abc"}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);
        assert_eq!(invalid.id, Some(RequestId::from("abc")));

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":7,"id":3}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);
        assert_eq!(invalid.id, Some(RequestId::Integer(3)));

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","id":3}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":5,"id":3}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);
        assert_eq!(invalid.id, Some(RequestId::Integer(3)));
    }

    #[test]
    fn test_missing_version_member() {
        let request = expect_valid(r#"{"method":"add","params":[2,3],"id":1}"#);
        assert_eq!(request.id(), Some(&RequestId::Integer(1)));

        let classified = classify_text(r#"{"method":"add","params":[1,1]}"#);
        assert!(classified.is_valid_notification());

        let invalid = expect_invalid(r#"{"jsonrpc":2,"method":"add","params":[1,1],"id":1}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);
        assert_eq!(invalid.id, Some(RequestId::Integer(1)));
    }

    #[test]
    fn test_invalid_message_unusable_id() {
        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":{"x":1}}"#);
        assert_eq!(invalid.kind, StandardErrorKind::InvalidMessage);
        assert_eq!(invalid.id, None);

        let invalid = expect_invalid(r#"{"jsonrpc":"2.0","method":"add","params":[1,2],"id":true}"#);
        assert_eq!(invalid.id, None);
    }

    #[test]
    fn test_non_object_envelope() {
        let classified = classify(RawEnvelope::from_value(json!(42)), &registry());
        assert_eq!(classified.error_kind(), Some(StandardErrorKind::InvalidMessage));
        assert_eq!(classified.id(), None);
        assert_eq!(classified.method(), None);
    }
}
