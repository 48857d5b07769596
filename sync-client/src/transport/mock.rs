//! Mock transport for testing.
//!
//! Captures sent messages for verification and can be told to fail.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sync_types::{Dictionary, TransactionId};
use tokio::sync::mpsc;

/// A message captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Transaction id the engine allocated.
    pub transaction: TransactionId,
    /// The wire dictionary.
    pub message: Dictionary,
}

/// Mock transport for testing.
///
/// Clones share state. An optional tap receives every successful send, which
/// lets async tests await the engine's next message.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent: Vec<SentMessage>,
    fail_next_send: Option<String>,
    disconnected: bool,
    tap: Option<mpsc::UnboundedSender<SentMessage>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport plus a stream of everything it sends.
    pub fn with_tap() -> (Self, mpsc::UnboundedReceiver<SentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self::new();
        transport.lock().tap = Some(tx);
        (transport, rx)
    }

    /// All messages sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    /// The last message sent.
    pub fn last_sent(&self) -> Option<SentMessage> {
        self.lock().sent.last().cloned()
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.lock().fail_next_send = Some(error.to_string());
    }

    /// Make every send fail until reconnected.
    pub fn set_connected(&self, connected: bool) {
        self.lock().disconnected = !connected;
    }

    /// Forget captured messages and forced failures.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.sent.clear();
        inner.fail_next_send = None;
        inner.disconnected = false;
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        transaction: TransactionId,
        message: &Dictionary,
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();

        if inner.disconnected {
            return Err(TransportError::NotConnected);
        }
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        let sent = SentMessage {
            transaction,
            message: message.clone(),
        };
        if let Some(tap) = &inner.tap {
            // a dropped receiver only means nobody is watching
            let _ = tap.send(sent.clone());
        }
        inner.sent.push(sent);
        Ok(())
    }
}
