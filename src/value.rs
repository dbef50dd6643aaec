//! Typed field values.
//!
//! A schema declares each field's element kind up front; parsing produces
//! `Value`s of that kind, and rendering turns them back into text.

use std::fmt;

/// Element kind of a field (the array element kind for array fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Char,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    /// Name used in diagnostics and in schema description files.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Text => "TEXT",
            ScalarKind::Char => "CHAR",
            ScalarKind::Bool => "BOOL",
            ScalarKind::I8 => "I8",
            ScalarKind::I16 => "I16",
            ScalarKind::I32 => "I32",
            ScalarKind::I64 => "I64",
            ScalarKind::U8 => "U8",
            ScalarKind::U16 => "U16",
            ScalarKind::U32 => "U32",
            ScalarKind::U64 => "U64",
            ScalarKind::F32 => "F32",
            ScalarKind::F64 => "F64",
        }
    }

    /// Look up a kind by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<ScalarKind> {
        let kind = match name.to_uppercase().as_str() {
            "TEXT" | "STRING" => ScalarKind::Text,
            "CHAR" => ScalarKind::Char,
            "BOOL" => ScalarKind::Bool,
            "I8" => ScalarKind::I8,
            "I16" => ScalarKind::I16,
            "I32" => ScalarKind::I32,
            "I64" => ScalarKind::I64,
            "U8" => ScalarKind::U8,
            "U16" => ScalarKind::U16,
            "U32" => ScalarKind::U32,
            "U64" => ScalarKind::U64,
            "F32" => ScalarKind::F32,
            "F64" => ScalarKind::F64,
            _ => return None,
        };
        Some(kind)
    }

    /// Text can always hold "no value"; every other kind needs to be
    /// declared nullable for that.
    pub fn is_reference(&self) -> bool {
        matches!(self, ScalarKind::Text)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarKind::Text | ScalarKind::Char | ScalarKind::Bool)
    }

    /// Built-in coercion from already-trimmed text.
    pub fn coerce(&self, text: &str) -> Result<Value, String> {
        fn int<T>(text: &str) -> Result<Value, String>
        where
            T: std::str::FromStr + Into<i64>,
            T::Err: fmt::Display,
        {
            text.parse::<T>()
                .map(|v| Value::Int(v.into()))
                .map_err(|e| e.to_string())
        }
        fn uint<T>(text: &str) -> Result<Value, String>
        where
            T: std::str::FromStr + Into<u64>,
            T::Err: fmt::Display,
        {
            text.parse::<T>()
                .map(|v| Value::UInt(v.into()))
                .map_err(|e| e.to_string())
        }

        match self {
            ScalarKind::Text => Ok(Value::Text(text.to_string())),
            ScalarKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err("expected exactly one character".to_string()),
                }
            }
            ScalarKind::Bool => {
                if text.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err("expected true or false".to_string())
                }
            }
            ScalarKind::I8 => int::<i8>(text),
            ScalarKind::I16 => int::<i16>(text),
            ScalarKind::I32 => int::<i32>(text),
            ScalarKind::I64 => int::<i64>(text),
            ScalarKind::U8 => uint::<u8>(text),
            ScalarKind::U16 => uint::<u16>(text),
            ScalarKind::U32 => uint::<u32>(text),
            ScalarKind::U64 => uint::<u64>(text),
            ScalarKind::F32 => text
                .parse::<f32>()
                .map(|v| Value::Float(f64::from(v)))
                .map_err(|e| e.to_string()),
            ScalarKind::F64 => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value.
    Null,
    Text(String),
    Char(char),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value can be stored in a field of `kind` as-is,
    /// including range checks for sized integers.
    pub fn kind_matches(&self, kind: ScalarKind) -> bool {
        match (self, kind) {
            (Value::Text(_), ScalarKind::Text) => true,
            (Value::Char(_), ScalarKind::Char) => true,
            (Value::Bool(_), ScalarKind::Bool) => true,
            (Value::Int(v), ScalarKind::I8) => i8::try_from(*v).is_ok(),
            (Value::Int(v), ScalarKind::I16) => i16::try_from(*v).is_ok(),
            (Value::Int(v), ScalarKind::I32) => i32::try_from(*v).is_ok(),
            (Value::Int(_), ScalarKind::I64) => true,
            (Value::UInt(v), ScalarKind::U8) => u8::try_from(*v).is_ok(),
            (Value::UInt(v), ScalarKind::U16) => u16::try_from(*v).is_ok(),
            (Value::UInt(v), ScalarKind::U32) => u32::try_from(*v).is_ok(),
            (Value::UInt(_), ScalarKind::U64) => true,
            (Value::Float(_), ScalarKind::F32 | ScalarKind::F64) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Char(c) => write!(f, "{c}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
