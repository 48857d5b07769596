//! Error types for agenda-sync codecs.

use thiserror::Error;

/// Errors that can occur while encoding or decoding agenda-sync data.
#[derive(Debug, Error)]
pub enum CodecError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Invalid command discriminator
    #[error("invalid command: {0}")]
    InvalidCommand(u8),

    /// A required dictionary key is absent
    #[error("missing key: {0}")]
    MissingKey(u32),

    /// A dictionary key holds a value of the wrong shape
    #[error("invalid value for key {key}: {reason}")]
    InvalidValue {
        /// The offending key.
        key: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// Timezone identifier could not be interpreted
    #[error("invalid timezone id: {0:?}")]
    InvalidTimezone(String),

    /// Source id must be non-empty
    #[error("source id must not be empty")]
    EmptySourceId,
}
