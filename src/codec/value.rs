//! Transit value tree.

use std::fmt;

/// A dynamically typed transit value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Fixed-width 64-bit integer.
    Integer(i64),
    /// Arbitrary-precision integer, kept as its decimal text.
    BigInt(String),
    Float(f64),
    /// Arbitrary-precision decimal, kept as its text.
    BigDecimal(String),
    String(String),
    /// Keyword name without the leading colon.
    Keyword(String),
    Symbol(String),
    Char(char),
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// ISO-8601 instant text.
    Instant(String),
    Uuid(String),
    Uri(String),
    Vector(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    /// Key/value pairs in insertion order.
    Map(Vec<(Value, Value)>),
    /// Value carrying an extension tag this codec has no native type for.
    Tagged(String, Box<Value>),
}

/// Type tag of a [`Value`], used for encoder dispatch and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueTag {
    Null,
    Bool,
    Integer,
    BigInt,
    Float,
    BigDecimal,
    String,
    Keyword,
    Symbol,
    Char,
    Bytes,
    Timestamp,
    Instant,
    Uuid,
    Uri,
    Vector,
    List,
    Set,
    Map,
    Tagged,
}

impl ValueTag {
    pub fn name(self) -> &'static str {
        match self {
            ValueTag::Null => "nil",
            ValueTag::Bool => "boolean",
            ValueTag::Integer => "integer",
            ValueTag::BigInt => "bigint",
            ValueTag::Float => "float",
            ValueTag::BigDecimal => "bigdec",
            ValueTag::String => "string",
            ValueTag::Keyword => "keyword",
            ValueTag::Symbol => "symbol",
            ValueTag::Char => "char",
            ValueTag::Bytes => "bytes",
            ValueTag::Timestamp => "timestamp",
            ValueTag::Instant => "instant",
            ValueTag::Uuid => "uuid",
            ValueTag::Uri => "uri",
            ValueTag::Vector => "vector",
            ValueTag::List => "list",
            ValueTag::Set => "set",
            ValueTag::Map => "map",
            ValueTag::Tagged => "tagged value",
        }
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Null => ValueTag::Null,
            Value::Bool(_) => ValueTag::Bool,
            Value::Integer(_) => ValueTag::Integer,
            Value::BigInt(_) => ValueTag::BigInt,
            Value::Float(_) => ValueTag::Float,
            Value::BigDecimal(_) => ValueTag::BigDecimal,
            Value::String(_) => ValueTag::String,
            Value::Keyword(_) => ValueTag::Keyword,
            Value::Symbol(_) => ValueTag::Symbol,
            Value::Char(_) => ValueTag::Char,
            Value::Bytes(_) => ValueTag::Bytes,
            Value::Timestamp(_) => ValueTag::Timestamp,
            Value::Instant(_) => ValueTag::Instant,
            Value::Uuid(_) => ValueTag::Uuid,
            Value::Uri(_) => ValueTag::Uri,
            Value::Vector(_) => ValueTag::Vector,
            Value::List(_) => ValueTag::List,
            Value::Set(_) => ValueTag::Set,
            Value::Map(_) => ValueTag::Map,
            Value::Tagged(..) => ValueTag::Tagged,
        }
    }

    /// Items of an ordered sequence (vector or list).
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a map entry by keyword name.
    pub fn get_keyword(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Value::Keyword(kw) if kw == name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
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
