//! The value box: a setting's current value, tagged with its [`ValueType`].
//!
//! Text inputs (env vars, flag values, string entries in config files) all go
//! through [`Value::parse`]. Decoded config file values go through
//! [`Value::from_untyped`]. The canonical text of a value is its `Display`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::ValueType;

/// A setting's value. The variant always equals the setting's [`ValueType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Int64(i64),
    String(String),
    Opaque(Opaque),
}

/// Catch-all payload for settings whose type the registry does not interpret.
///
/// Opaque values cannot be parsed from text and never become flags.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Opaque(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is what it holds.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Value {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Opaque::new(value))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Int64(_) => ValueType::Int64,
            Value::String(_) => ValueType::String,
            Value::Opaque(_) => ValueType::Opaque,
        }
    }

    /// Convert text into a value of type `ty`.
    ///
    /// Returns `None` when the text does not parse or `ty` is `Opaque`.
    pub fn parse(ty: ValueType, text: &str) -> Option<Value> {
        match ty {
            ValueType::Bool => parse_bool(text).map(Value::Bool),
            ValueType::Int => text.parse::<i32>().ok().map(Value::Int),
            ValueType::Int64 => text.parse::<i64>().ok().map(Value::Int64),
            ValueType::String => Some(Value::String(text.to_string())),
            ValueType::Opaque => None,
        }
    }

    /// Convert a decoded config file value into a value of type `ty`.
    ///
    /// Strings are run through [`parse`](Self::parse). Numbers and booleans
    /// are accepted by string targets as their text.
    pub fn from_untyped(ty: ValueType, raw: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as J;

        match (ty, raw) {
            (ValueType::Opaque, _) => None,
            (_, J::String(s)) => Value::parse(ty, s),
            (ValueType::Bool, J::Bool(b)) => Some(Value::Bool(*b)),
            (ValueType::Int, J::Number(n)) => {
                n.as_i64().and_then(|i| i32::try_from(i).ok()).map(Value::Int)
            }
            (ValueType::Int64, J::Number(n)) => n.as_i64().map(Value::Int64),
            (ValueType::String, J::Number(n)) => Some(Value::String(n.to_string())),
            (ValueType::String, J::Bool(b)) => Some(Value::String(b.to_string())),
            _ => None,
        }
    }

    /// Coerce an already-typed value into `ty`. `Int` widens into `Int64`.
    pub(crate) fn coerce(self, ty: ValueType) -> Result<Value, Value> {
        match (self, ty) {
            (Value::Int(i), ValueType::Int64) => Ok(Value::Int64(i64::from(i))),
            (v, ty) if v.value_type() == ty => Ok(v),
            (v, _) => Err(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::String(s) => f.write_str(s),
            Value::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

/// Permissive truth parser: `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Opaque> for Value {
    fn from(v: Opaque) -> Self {
        Value::Opaque(v)
    }
}

/// Scalar types readable from the registry with [`Registry::get`](crate::Registry::get).
pub trait FromValue: Sized {
    const TYPE: ValueType;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const TYPE: ValueType = ValueType::Int;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const TYPE: ValueType = ValueType::Int64;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for String {
    const TYPE: ValueType = ValueType::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}
