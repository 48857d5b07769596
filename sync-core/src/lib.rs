//! # sync-core
//!
//! Pure protocol logic for agenda-sync (no I/O, instant tests).
//!
//! This crate implements the sync state machine and the list-building
//! pipeline without any transport, timer or clock access.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The current time is passed in, timers are requested
//! as actions and come back as events. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (transport, timers, notifications) is performed by
//! `sync-client`, which interprets the actions produced by [`SyncEngine`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod inflight;
pub mod notify;
pub mod state;
pub mod store;
pub mod sync_id;

pub use aggregator::build_sync_list;
pub use config::EngineConfig;
pub use engine::SyncEngine;
pub use inflight::{InFlight, RetryDecision};
pub use notify::NotificationLimiter;
pub use state::{Action, Event, Notification, Status, SyncState};
pub use store::PerSourceStore;
pub use sync_id::SyncIdTracker;
