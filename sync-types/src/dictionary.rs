//! The key-value payload exchanged with the watch.
//!
//! The watch speaks in small dictionaries keyed by integers with typed
//! values. The transport moves these; [`Dictionary::to_bytes`] gives the
//! MessagePack form used for size accounting and logging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::CodecError;

/// A typed dictionary value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Unsigned byte.
    U8(u8),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// UTF-8 string.
    Str(String),
}

/// Integer-keyed dictionary, ordered by key for stable encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dictionary(BTreeMap<u32, Value>);

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a byte value.
    pub fn put_u8(&mut self, key: u32, value: u8) -> &mut Self {
        self.0.insert(key, Value::U8(value));
        self
    }

    /// Insert a 32-bit unsigned value.
    pub fn put_u32(&mut self, key: u32, value: u32) -> &mut Self {
        self.0.insert(key, Value::U32(value));
        self
    }

    /// Insert a 32-bit signed value.
    pub fn put_i32(&mut self, key: u32, value: i32) -> &mut Self {
        self.0.insert(key, Value::I32(value));
        self
    }

    /// Insert a string value.
    pub fn put_str(&mut self, key: u32, value: impl Into<String>) -> &mut Self {
        self.0.insert(key, Value::Str(value.into()));
        self
    }

    /// Raw access to a value.
    pub fn get(&self, key: u32) -> Option<&Value> {
        self.0.get(&key)
    }

    /// Whether the key is present.
    pub fn contains(&self, key: u32) -> bool {
        self.0.contains_key(&key)
    }

    /// Read any integer value, widening to `i64`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the key
    /// holds a string.
    pub fn get_integer(&self, key: u32) -> Result<Option<i64>, CodecError> {
        match self.0.get(&key) {
            None => Ok(None),
            Some(Value::U8(v)) => Ok(Some(i64::from(*v))),
            Some(Value::U32(v)) => Ok(Some(i64::from(*v))),
            Some(Value::I32(v)) => Ok(Some(i64::from(*v))),
            Some(Value::Str(_)) => Err(CodecError::InvalidValue {
                key,
                reason: "expected integer, found string".into(),
            }),
        }
    }

    /// Read a string value.
    pub fn get_str(&self, key: u32) -> Option<&str> {
        match self.0.get(&key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(self).map_err(CodecError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}
