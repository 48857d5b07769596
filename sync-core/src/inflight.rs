//! Bookkeeping for the single message in flight.
//!
//! Every outbound message is a new transaction. The record tracks:
//! - the transaction id expected in the next ack/nack
//! - the payload to resend after a nack
//! - a send generation used to discard stale resend timers
//! - the number of resends of the current payload

use sync_types::{Dictionary, TransactionId};

/// Outcome of a nack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Resend after a delay; the timer must carry this generation.
    Resend {
        /// Generation of the payload to resend.
        generation: u64,
    },
    /// The retry ceiling was reached.
    Exhausted,
}

/// The in-flight transaction record.
#[derive(Debug, Clone)]
pub struct InFlight {
    next_transaction: TransactionId,
    current: Option<TransactionId>,
    payload: Option<Dictionary>,
    generation: u64,
    retries: u32,
    max_retries: u32,
}

impl InFlight {
    /// Create an empty record allowing `max_retries` resends per payload.
    pub fn new(max_retries: u32) -> Self {
        Self {
            next_transaction: TransactionId::new(0),
            current: None,
            payload: None,
            generation: 0,
            retries: 0,
            max_retries,
        }
    }

    /// Record a new payload and allocate its transaction id.
    pub fn begin(&mut self, payload: Dictionary) -> TransactionId {
        self.generation = self.generation.wrapping_add(1);
        self.retries = 0;
        self.payload = Some(payload);
        self.allocate()
    }

    /// Decide what to do about a nack of the current transaction.
    pub fn on_nack(&self) -> RetryDecision {
        if self.payload.is_none() || self.retries >= self.max_retries {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Resend {
                generation: self.generation,
            }
        }
    }

    /// Resend the current payload if `generation` still names it.
    ///
    /// The resend gets a fresh transaction id.
    pub fn resend(&mut self, generation: u64) -> Option<(TransactionId, Dictionary)> {
        if generation != self.generation {
            return None;
        }
        let payload = self.payload.clone()?;
        self.retries += 1;
        Some((self.allocate(), payload))
    }

    /// Whether `transaction` is the one awaiting an ack.
    pub fn matches(&self, transaction: TransactionId) -> bool {
        self.current == Some(transaction)
    }

    /// The transaction awaiting an ack.
    pub fn current(&self) -> Option<TransactionId> {
        self.current
    }

    /// The payload that would be resent.
    pub fn payload(&self) -> Option<&Dictionary> {
        self.payload.as_ref()
    }

    /// Generation of the current payload.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resends of the current payload so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Forget the in-flight message. Pending resend timers become stale.
    pub fn clear(&mut self) {
        self.current = None;
        self.payload = None;
        self.generation = self.generation.wrapping_add(1);
        self.retries = 0;
    }

    fn allocate(&mut self) -> TransactionId {
        let id = self.next_transaction;
        self.next_transaction = id.next();
        self.current = Some(id);
        id
    }
}
