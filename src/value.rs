//! Dynamic values passed to and returned from chained methods.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MethodError, MethodResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Map(Vec<(String, Value)>), // insertion ordered
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Render as a SQL literal: strings quoted, everything else verbatim
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Str(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Positional argument extraction for registered methods
pub trait ArgList {
    fn get_value(&self, position: usize) -> Option<&Value>;
    fn require_value(&self, position: usize) -> MethodResult<&Value>;
    fn require_f64(&self, position: usize) -> MethodResult<f64>;
    fn require_str(&self, position: usize) -> MethodResult<&str>;
    fn require_map(&self, position: usize) -> MethodResult<&[(String, Value)]>;
}

impl ArgList for [Value] {
    fn get_value(&self, position: usize) -> Option<&Value> {
        self.get(position)
    }

    fn require_value(&self, position: usize) -> MethodResult<&Value> {
        self.get_value(position)
            .ok_or(MethodError::MissingArgument { position })
    }

    fn require_f64(&self, position: usize) -> MethodResult<f64> {
        let value = self.require_value(position)?;
        value.as_f64().ok_or_else(|| mismatch(position, "number", value))
    }

    fn require_str(&self, position: usize) -> MethodResult<&str> {
        let value = self.require_value(position)?;
        value.as_str().ok_or_else(|| mismatch(position, "string", value))
    }

    fn require_map(&self, position: usize) -> MethodResult<&[(String, Value)]> {
        let value = self.require_value(position)?;
        value.as_map().ok_or_else(|| mismatch(position, "map", value))
    }
}

fn mismatch(position: usize, expected: &str, found: &Value) -> MethodError {
    MethodError::TypeMismatch {
        position,
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}
