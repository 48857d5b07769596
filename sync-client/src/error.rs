//! Error types for sync-client.

use sync_types::CodecError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by the service handle and data sources.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service task has stopped.
    #[error("sync service stopped")]
    Stopped,

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A data source could not produce its items.
    #[error("source {source_id} failed: {reason}")]
    Source {
        /// The failing source.
        source_id: String,
        /// What went wrong.
        reason: String,
    },
}
