//! Method contracts: the parameter shape a method expects.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Expected kind of a single parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Any,
    Boolean,
    Integer,
    /// Any number; integers widen into floats
    Float,
    String,
    Array,
    Object,
    /// `null` or the inner kind
    Nullable(Box<ParamKind>),
}

impl ParamKind {
    /// Wrap a kind so that `null` is accepted as well
    pub fn nullable(kind: ParamKind) -> Self {
        match kind {
            ParamKind::Nullable(_) | ParamKind::Any => kind,
            other => ParamKind::Nullable(Box::new(other)),
        }
    }

    /// Check whether a wire value converts to this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::Any => true,
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Float => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Nullable(inner) => value.is_null() || inner.accepts(value),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Any => f.write_str("any"),
            ParamKind::Boolean => f.write_str("boolean"),
            ParamKind::Integer => f.write_str("integer"),
            ParamKind::Float => f.write_str("float"),
            ParamKind::String => f.write_str("string"),
            ParamKind::Array => f.write_str("array"),
            ParamKind::Object => f.write_str("object"),
            ParamKind::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}

/// A parameter bound by name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParam {
    kind: ParamKind,
    default: Option<Value>,
}

impl NamedParam {
    /// A parameter that must be present in the request
    pub fn required(kind: ParamKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    /// A parameter the binding layer fills in when the request omits it
    pub fn optional(kind: ParamKind, default: Value) -> Self {
        Self {
            kind,
            default: Some(default),
        }
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Parameter shape of a method
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamShape {
    /// No parameters; an absent or empty `params` member is accepted
    #[default]
    None,
    /// Ordered list of expected kinds
    Positional(Vec<ParamKind>),
    /// Parameter name to expected kind
    Named(BTreeMap<String, NamedParam>),
}

/// Contract a method is registered with
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodContract {
    shape: ParamShape,
    notification_only: bool,
}

impl MethodContract {
    /// A method that takes no parameters
    pub fn no_params() -> Self {
        Self::default()
    }

    /// A method bound by position
    pub fn positional(kinds: impl IntoIterator<Item = ParamKind>) -> Self {
        Self {
            shape: ParamShape::Positional(kinds.into_iter().collect()),
            notification_only: false,
        }
    }

    /// A method bound by name; every parameter is required
    pub fn named<K>(params: impl IntoIterator<Item = (K, ParamKind)>) -> Self
    where
        K: Into<String>,
    {
        Self::named_with(
            params
                .into_iter()
                .map(|(name, kind)| (name, NamedParam::required(kind))),
        )
    }

    /// A method bound by name with per-parameter defaults
    pub fn named_with<K>(params: impl IntoIterator<Item = (K, NamedParam)>) -> Self
    where
        K: Into<String>,
    {
        Self {
            shape: ParamShape::Named(
                params
                    .into_iter()
                    .map(|(name, param)| (name.into(), param))
                    .collect(),
            ),
            notification_only: false,
        }
    }

    /// Mark the method as one that never produces a result
    pub fn notification_only(mut self) -> Self {
        self.notification_only = true;
        self
    }

    pub fn shape(&self) -> &ParamShape {
        &self.shape
    }

    pub fn is_notification_only(&self) -> bool {
        self.notification_only
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        match &self.shape {
            ParamShape::None => 0,
            ParamShape::Positional(kinds) => kinds.len(),
            ParamShape::Named(params) => params.len(),
        }
    }
}
