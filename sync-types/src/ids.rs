//! Identity and versioning types for agenda-sync.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CodecError;

/// Stable identifier of a data source (e.g. the calendar reader).
///
/// Never empty. Ordered lexicographically, which is the last tie-break
/// in the agenda item order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Create a SourceId, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, CodecError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CodecError::EmptySourceId);
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceId> for String {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

/// One-byte tag identifying a successfully delivered dataset.
///
/// `0` is reserved for "unknown"; assigned ids cycle through `1..=255`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SyncId(u8);

impl SyncId {
    /// The reserved "unknown" id.
    pub const UNKNOWN: SyncId = SyncId(0);

    /// Create a SyncId with the given value.
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Get the numeric value of this SyncId.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether this is the reserved "unknown" id.
    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }

    /// The next id in sequence, wrapping from 255 to 1 and skipping 0.
    pub fn next(&self) -> Self {
        match self.0.wrapping_add(1) {
            0 => Self(1),
            n => Self(n),
        }
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncId({})", self.0)
    }
}

/// Identifier of one outbound transmission, echoed back by ack/nack events.
///
/// Drawn from a modulo-256 counter owned by the engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TransactionId(u8);

impl TransactionId {
    /// Create a TransactionId with the given value.
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Get the numeric value of this TransactionId.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// The next id, wrapping modulo 256.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}
