//! Per-node attribute store.
//!
//! Attributes are a metadata side-channel: an independent name-to-value map
//! that is orthogonal to the node's own value and survives its
//! reassignment. Missing attributes read as a type-appropriate zero for
//! bool/int/real; a text read of a missing attribute fails because no zero
//! text exists.

use indexmap::IndexMap;

use crate::error::{OptionsError, Result};
use crate::value::OptionValue;

/// Name-to-value attribute map attached to a tree node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    entries: IndexMap<String, OptionValue>,
}

impl AttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an attribute.
    pub fn set(&mut self, name: &str, value: OptionValue) {
        self.entries.insert(name.to_string(), value);
    }

    /// Raw lookup without zero-defaulting.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.get(name)
    }

    /// True if the attribute exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no attributes are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Read as bool; missing reads as `false`.
    pub fn read_bool(&self, name: &str, node_path: &str) -> Result<bool> {
        match self.entries.get(name) {
            None => Ok(false),
            Some(value) => value
                .to_bool()
                .ok_or_else(|| conversion_error(node_path, name, value, "bool")),
        }
    }

    /// Read as integer; missing reads as `0`.
    pub fn read_int(&self, name: &str, node_path: &str) -> Result<i64> {
        match self.entries.get(name) {
            None => Ok(0),
            Some(value) => value
                .to_int()
                .ok_or_else(|| conversion_error(node_path, name, value, "int")),
        }
    }

    /// Read as real; missing reads as `0.0`.
    pub fn read_real(&self, name: &str, node_path: &str) -> Result<f64> {
        match self.entries.get(name) {
            None => Ok(0.0),
            Some(value) => value
                .to_real()
                .ok_or_else(|| conversion_error(node_path, name, value, "real")),
        }
    }

    /// Read as text; missing is an error since no zero text exists.
    pub fn read_text(&self, name: &str, node_path: &str) -> Result<String> {
        match self.entries.get(name) {
            None => Err(conversion_error(node_path, name, &OptionValue::Unset, "text")),
            Some(value) => value
                .to_text()
                .ok_or_else(|| conversion_error(node_path, name, value, "text")),
        }
    }
}

fn conversion_error(
    node_path: &str,
    name: &str,
    value: &OptionValue,
    to: &'static str,
) -> OptionsError {
    let path = if node_path.is_empty() {
        name.to_string()
    } else {
        format!("{node_path}:{name}")
    };
    OptionsError::Conversion {
        path,
        from: value.tag(),
        to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_attributes_read_as_zero() {
        let store = AttributeStore::new();

        assert_eq!(store.read_bool("test", "").unwrap(), false);
        assert_eq!(store.read_int("test", "").unwrap(), 0);
        assert_eq!(store.read_real("test", "").unwrap(), 0.0);
    }

    #[test]
    fn test_missing_attribute_as_text_fails() {
        let store = AttributeStore::new();

        let err = store.read_text("test", "mesh").unwrap_err();
        assert_eq!(
            err,
            OptionsError::Conversion {
                path: "mesh:test".to_string(),
                from: "unset",
                to: "text",
            }
        );
    }

    #[test]
    fn test_store_and_overwrite() {
        let mut store = AttributeStore::new();

        store.set("test", OptionValue::Bool(true));
        assert!(store.read_bool("test", "").unwrap());

        store.set("test", OptionValue::Bool(false));
        assert!(!store.read_bool("test", "").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_typed_reads() {
        let mut store = AttributeStore::new();
        store.set("count", OptionValue::Int(42));
        store.set("scale", OptionValue::Real(3.1415));
        store.set("label", OptionValue::from("hello"));

        assert_eq!(store.read_int("count", "").unwrap(), 42);
        assert_eq!(store.read_real("scale", "").unwrap(), 3.1415);
        assert_eq!(store.read_text("label", "").unwrap(), "hello");
    }

    #[test]
    fn test_uncoercible_attribute_fails() {
        let mut store = AttributeStore::new();
        store.set("label", OptionValue::from("hello"));

        assert!(store.read_int("label", "").is_err());
        assert!(store.read_bool("label", "").is_err());
    }
}
