use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

use crate::{eval::RuntimeError, system::Builtin};

/// Static type of an expression, and the kind tag of a runtime [`Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Integer,
    String,
    Boolean,
    ArrayInteger,
    ArrayString,
    Function,
    Null,
    Error,
    /// Checker-only wildcard for identifiers, whose type is only known at run time.
    Ident,
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectType::Integer => "INTEGER",
            ObjectType::String => "STRING",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::ArrayInteger => "ARRAY_INTEGER",
            ObjectType::ArrayString => "ARRAY_STRING",
            ObjectType::Function => "FUNCTION",
            ObjectType::Null => "NULL",
            ObjectType::Error => "ERROR",
            ObjectType::Ident => "IDENT",
        };
        f.write_str(name)
    }
}

/// A runtime value. Errors are values too and propagate through evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Integer(i64),
    String(String),
    Boolean(bool),
    ArrayInteger(Vec<i64>),
    ArrayString(Vec<String>),
    Builtin(Builtin),
    Error(RuntimeError),
    Null,
}

pub const TRUE: Object = Object::Boolean(true);
pub const FALSE: Object = Object::Boolean(false);

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::String(_) => ObjectType::String,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::ArrayInteger(_) => ObjectType::ArrayInteger,
            Object::ArrayString(_) => ObjectType::ArrayString,
            Object::Builtin(_) => ObjectType::Function,
            Object::Error(_) => ObjectType::Error,
            Object::Null => ObjectType::Null,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// Truthiness used by `&&` and `||`. Kinds without a natural truth value
    /// count as true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Boolean(value) => *value,
            Object::String(value) => !value.is_empty(),
            Object::Integer(value) => *value != 0,
            _ => true,
        }
    }

    pub fn from_bool(value: bool) -> Object {
        if value { TRUE } else { FALSE }
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::from_bool(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::String(value.to_string())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::String(value)
    }
}

impl From<Vec<i64>> for Object {
    fn from(values: Vec<i64>) -> Self {
        Object::ArrayInteger(values)
    }
}

impl From<Vec<String>> for Object {
    fn from(values: Vec<String>) -> Self {
        Object::ArrayString(values)
    }
}

impl From<RuntimeError> for Object {
    fn from(error: RuntimeError) -> Self {
        Object::Error(error)
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Integer(n) => write!(f, "{n}"),
            Object::String(s) => write!(f, "{s}"),
            Object::Boolean(b) => write!(f, "{b}"),
            Object::ArrayInteger(values) => {
                let items: Vec<_> = values.iter().map(i64::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Object::ArrayString(values) => {
                let items: Vec<_> = values.iter().map(|s| format!("\"{s}\"")).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Object::Builtin(builtin) => write!(f, "builtin function {}", builtin.name()),
            Object::Error(error) => write!(f, "ERROR: {error}"),
            Object::Null => write!(f, "null"),
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConversionError {
    #[error("{0} is not a 64-bit integer")]
    #[diagnostic(help("only integers, strings, booleans and arrays of them can be bound"))]
    NotAnInteger(serde_json::Number),

    #[error("arrays must hold only integers or only strings, found {0}")]
    MixedArray(String),

    #[error("JSON objects cannot be bound to a name")]
    Map,
}

impl TryFrom<serde_json::Value> for Object {
    type Error = ConversionError;

    fn try_from(value: serde_json::Value) -> Result<Self, ConversionError> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => Object::Null,
            Value::Bool(b) => Object::Boolean(b),
            Value::Number(n) => Object::Integer(n.as_i64().ok_or(ConversionError::NotAnInteger(n))?),
            Value::String(s) => Object::String(s),
            Value::Array(items) if items.iter().all(Value::is_string) => Object::ArrayString(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Array(items) => Object::ArrayInteger(
                items
                    .iter()
                    .map(|item| {
                        item.as_i64()
                            .ok_or_else(|| ConversionError::MixedArray(Value::Array(items.clone()).to_string()))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => return Err(ConversionError::Map),
        })
    }
}
