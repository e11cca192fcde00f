//! Values produced by a translation pass.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::Error;

/// Ordered mapping used for dictionary values.
pub type Dictionary = IndexMap<String, Value>;

/// A value produced by evaluating an expression or building a literal.
///
/// Composite variants own their children; cloning a composite clones the
/// whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Array(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    /// Returns an empty dictionary.
    pub fn dictionary() -> Self {
        Value::Dictionary(Dictionary::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Text(_) => "string",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Dictionary(_))
    }

    /// Converts the value tree into its TOML equivalent.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Value::Integer(i) => toml::Value::Integer(*i),
            Value::Text(s) => toml::Value::String(s.clone()),
            Value::Array(items) => toml::Value::Array(items.iter().map(Value::to_toml).collect()),
            Value::Dictionary(entries) => toml::Value::Table(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_toml()))
                    .collect(),
            ),
        }
    }

    /// Deserializes the value into a typed structure.
    ///
    /// ```
    /// use conflang::Translator;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Server {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// let value = Translator::builder().translate_str("{ host: 'localhost', port: 8080 }")?;
    /// let server: Server = value.deserialize()?;
    /// assert_eq!(server.port, 8080);
    /// # Ok::<(), conflang::Error>(())
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.to_toml().try_into().map_err(Error::DeserializeError)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Value::Dictionary(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
