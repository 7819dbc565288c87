//! Per-request attribute storage with typed, fallible access.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error raised when a stored attribute cannot be coerced to the
/// requested type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttrError {
    #[error("`{key}` cannot be read as {expected}")]
    Coerce { key: String, expected: &'static str },
}

impl AttrError {
    pub(crate) fn coerce(key: &str, expected: &'static str) -> Self {
        AttrError::Coerce {
            key: key.to_string(),
            expected,
        }
    }
}

/// A value stored in the attribute store.
///
/// Scalar variants coerce across the typed accessors; `Any` carries an
/// arbitrary shared payload and only comes back out via
/// [`Value::downcast_ref`].
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Any(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap an arbitrary payload.
    pub fn any(value: impl Any + Send + Sync) -> Self {
        Value::Any(Arc::new(value))
    }

    /// Borrow an `Any` payload as a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Any(v) => v.downcast_ref(),
            _ => None,
        }
    }

    /// String form of a scalar value; `None` for `Any` payloads.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Bool(v) => Some(v.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Any(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

/// Per-request key/value scratch space.
///
/// Absence of a key is meaningful: setting a key to an absent value removes
/// it, so `contains` never observes a tombstone.
#[derive(Debug, Default)]
pub struct AttributeStore {
    map: HashMap<String, Value>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.map.insert(key.into(), value.into());
    }

    /// Set or remove: `None` removes the key.
    pub fn set_opt(&mut self, key: impl Into<String>, value: Option<impl Into<Value>>) {
        match value {
            Some(v) => self.set(key, v),
            None => {
                self.map.remove(&key.into());
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Integer coercion: missing keys default to 0, numeric values
    /// truncate, strings parse.
    pub fn get_i64(&self, key: &str) -> Result<i64, AttrError> {
        match self.map.get(key) {
            None => Ok(0),
            Some(Value::Int(v)) => Ok(*v),
            Some(Value::Float(v)) => Ok(*v as i64),
            Some(Value::Str(s)) => s.parse().map_err(|_| AttrError::coerce(key, "i64")),
            Some(_) => Err(AttrError::coerce(key, "i64")),
        }
    }

    /// Float coercion: missing keys default to 0.0.
    pub fn get_f64(&self, key: &str) -> Result<f64, AttrError> {
        match self.map.get(key) {
            None => Ok(0.0),
            Some(Value::Int(v)) => Ok(*v as f64),
            Some(Value::Float(v)) => Ok(*v),
            Some(Value::Str(s)) => s.parse().map_err(|_| AttrError::coerce(key, "f64")),
            Some(_) => Err(AttrError::coerce(key, "f64")),
        }
    }

    /// Boolean coercion: missing keys default to false; strings compare
    /// case-insensitively against `"true"`.
    pub fn get_bool(&self, key: &str) -> Result<bool, AttrError> {
        match self.map.get(key) {
            None => Ok(false),
            Some(Value::Bool(v)) => Ok(*v),
            Some(Value::Str(s)) => Ok(s.eq_ignore_ascii_case("true")),
            Some(_) => Err(AttrError::coerce(key, "bool")),
        }
    }

    /// String form of a scalar attribute; missing keys and opaque payloads
    /// yield `None`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(Value::as_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Store Tests ===

    #[test]
    fn test_set_get_remove() {
        let mut store = AttributeStore::new();
        assert!(store.is_empty());

        store.set("a", 1i64);
        assert!(store.contains("a"));
        assert_eq!(store.len(), 1);

        store.remove("a");
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_set_opt_none_removes() {
        let mut store = AttributeStore::new();
        store.set("a", "x");
        store.set_opt("a", None::<Value>);
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_set_opt_some_sets() {
        let mut store = AttributeStore::new();
        store.set_opt("a", Some("x"));
        assert_eq!(store.get_string("a").as_deref(), Some("x"));
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = AttributeStore::new();
        store.set("a", 1i64);
        store.set("a", 2i64);
        assert_eq!(store.get_i64("a").unwrap(), 2);
    }

    // === Coercion Tests ===

    #[test]
    fn test_get_i64_defaults_to_zero() {
        let store = AttributeStore::new();
        assert_eq!(store.get_i64("missing").unwrap(), 0);
    }

    #[test]
    fn test_get_i64_parses_strings() {
        let mut store = AttributeStore::new();
        store.set("n", "12");
        assert_eq!(store.get_i64("n").unwrap(), 12);
    }

    #[test]
    fn test_get_i64_truncates_floats() {
        let mut store = AttributeStore::new();
        store.set("n", 3.7f64);
        assert_eq!(store.get_i64("n").unwrap(), 3);
    }

    #[test]
    fn test_get_i64_rejects_garbage() {
        let mut store = AttributeStore::new();
        store.set("n", "twelve");
        assert_eq!(
            store.get_i64("n"),
            Err(AttrError::coerce("n", "i64"))
        );
    }

    #[test]
    fn test_get_f64_widens_ints() {
        let mut store = AttributeStore::new();
        store.set("n", 5i64);
        assert_eq!(store.get_f64("n").unwrap(), 5.0);
    }

    #[test]
    fn test_get_bool_defaults_false() {
        let store = AttributeStore::new();
        assert!(!store.get_bool("missing").unwrap());
    }

    #[test]
    fn test_get_bool_string_forms() {
        let mut store = AttributeStore::new();
        store.set("b", "True");
        assert!(store.get_bool("b").unwrap());

        store.set("b", "no");
        assert!(!store.get_bool("b").unwrap());
    }

    #[test]
    fn test_get_bool_rejects_numbers() {
        let mut store = AttributeStore::new();
        store.set("b", 1i64);
        assert!(store.get_bool("b").is_err());
    }

    #[test]
    fn test_get_string_formats_scalars() {
        let mut store = AttributeStore::new();
        store.set("n", 42i64);
        assert_eq!(store.get_string("n").as_deref(), Some("42"));
        assert_eq!(store.get_string("missing"), None);
    }

    // === Any Payload Tests ===

    #[test]
    fn test_any_roundtrip() {
        #[derive(Debug, PartialEq)]
        struct Token(u32);

        let mut store = AttributeStore::new();
        store.set("token", Value::any(Token(7)));

        let value = store.get("token").unwrap();
        assert_eq!(value.downcast_ref::<Token>(), Some(&Token(7)));
        assert_eq!(value.downcast_ref::<String>(), None);
    }

    #[test]
    fn test_any_has_no_string_form() {
        let mut store = AttributeStore::new();
        store.set("token", Value::any(vec![1u8, 2, 3]));
        assert_eq!(store.get_string("token"), None);
        assert!(store.get_i64("token").is_err());
    }
}
