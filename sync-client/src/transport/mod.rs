//! Transport abstraction for agenda-sync.
//!
//! The link to the watch is message-oriented and lossy. Outbound messages
//! are handed over with the transaction id the engine allocated; the link
//! reports delivery later as a [`TransportEvent`] on the channel given to the
//! service.
//!
//! # Design
//!
//! - `send()` hands one dictionary to the link and returns immediately
//! - acks, nacks and watch requests arrive as [`TransportEvent`]s
//! - a failed `send()` is treated like a nack of that transaction
//!
//! # Example
//!
//! ```ignore
//! let (link_tx, link_rx) = tokio::sync::mpsc::unbounded_channel();
//! let transport = MockTransport::new();
//! let (service, handle) = AgendaService::new(config, settings, transport, link_rx);
//! // the link layer reports deliveries:
//! link_tx.send(TransportEvent::Ack(transaction))?;
//! ```

mod mock;

pub use mock::{MockTransport, SentMessage};

use async_trait::async_trait;
use sync_types::{Dictionary, TransactionId};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The watch is not reachable.
    #[error("peer not connected")]
    NotConnected,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The message does not fit the link's payload limit.
    #[error("message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Encoded size.
        size: usize,
        /// Link limit.
        max: usize,
    },
}

/// Inbound events reported by the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The watch received the message.
    Ack(TransactionId),
    /// The message was not delivered.
    Nack(TransactionId),
    /// The watch sent a request dictionary.
    PeerRequest(Dictionary),
}

/// Outbound half of the link to the watch.
///
/// Implementations only hand messages over; they never block waiting for
/// delivery.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hand a message to the link under the given transaction id.
    async fn send(&self, transaction: TransactionId, message: &Dictionary)
        -> Result<(), TransportError>;
}
