//! Request payload accumulated before a call is dispatched.
//!
//! Parameters are kept in insertion order and serialized as one JSON object
//! which becomes the POST body. An empty payload serializes to the empty
//! string, never to `{}`: the server treats a missing body as "no parameters".

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::error::PayloadError;

/// A single parameter value.
///
/// The variant is chosen at the call site by the static type of the value
/// (see the `From` impls), not by inspecting it at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// Integer number
    Int(i64),
    /// String (also used for enum values, which travel as their name)
    Str(String),
    /// Boolean
    Bool(bool),
    /// Structured object in its canonical JSON projection
    Struct(Value),
    /// List whose elements are mapped independently, kinds may be mixed
    List(Vec<PayloadValue>),
}

impl PayloadValue {
    /// Project any serializable bean into a `Struct` value.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        serde_json::to_value(value)
            .map(Self::Struct)
            .map_err(|e| PayloadError::Serialize(e.to_string()))
    }

    /// Encode an enum by its symbolic name.
    ///
    /// Fails for values that do not serialize to a bare string (for example
    /// enum variants carrying data).
    pub fn symbol<E: Serialize + ?Sized>(value: &E) -> Result<Self, PayloadError> {
        match serde_json::to_value(value) {
            Ok(Value::String(name)) => Ok(Self::Str(name)),
            Ok(other) => Err(PayloadError::NotSymbolic(other.to_string())),
            Err(e) => Err(PayloadError::Serialize(e.to_string())),
        }
    }

    /// Build a list from anything convertible element by element.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PayloadValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// JSON representation of this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Str(s) => Value::String(s.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Struct(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PayloadValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PayloadValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&String> for PayloadValue {
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

impl<T: Into<PayloadValue>> From<Vec<T>> for PayloadValue {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

/// Named parameters of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    params: Map<String, Value>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter. A repeated name overwrites the previous value.
    pub fn put(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Result<&mut Self, PayloadError> {
        let name = name.into();
        if name.is_empty() {
            return Err(PayloadError::EmptyName);
        }
        self.params.insert(name, value.into().to_json());
        Ok(self)
    }

    /// Set a structured (bean) parameter.
    pub fn put_struct<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, PayloadError> {
        let value = PayloadValue::structured(value)?;
        self.put(name, value)
    }

    /// Set an enum parameter by its symbolic name.
    pub fn put_enum<E: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &E,
    ) -> Result<&mut Self, PayloadError> {
        let value = PayloadValue::symbol(value)?;
        self.put(name, value)
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when no parameter was set
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Serialize the payload as the request body.
    ///
    /// Returns the empty string when no parameter was set.
    pub fn to_json(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        Value::Object(self.params.clone()).to_string()
    }
}
