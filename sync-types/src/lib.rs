//! # sync-types
//!
//! Item model and wire format for the agenda-sync protocol.
//!
//! This crate provides the foundational types used across all agenda-sync crates:
//! - [`AgendaItem`], [`Line`] - The immutable agenda entry published by sources
//! - [`SourceId`], [`SyncId`], [`TransactionId`] - Identity and versioning types
//! - [`wire_time`] - The packed integer time format understood by the watch
//! - [`Dictionary`] - The small key-value payload moved by the transport
//! - [`Message`], [`PeerRequest`] - Protocol messages in both directions
//! - [`DisplaySettings`] - User preferences consulted by the codec
//! - [`CodecError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dictionary;
mod error;
mod ids;
mod item;
mod messages;
mod settings;
mod time;

pub use dictionary::{Dictionary, Value};
pub use error::CodecError;
pub use ids::{SourceId, SyncId, TransactionId};
pub use item::{AgendaItem, Line, Overflow, TimeDisplay};
pub use messages::{
    fits_single_message, keys, sendable_text, style_byte, Command, ItemPayload, Message,
    PeerRequest, DEFAULT_PEER_MIN_VERSION, MAX_STRING_LEN, SINGLE_MESSAGE_THRESHOLD,
};
pub use settings::{DisplaySettings, VibratePattern};
pub use time::{wire_time, Zone};
