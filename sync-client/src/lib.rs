//! # sync-client
//!
//! Async runtime for the agenda-sync protocol.
//!
//! This is the crate applications embed to keep a watch's agenda current.
//!
//! ## Features
//!
//! - **Single-owner engine**: one tokio task serializes every protocol event
//! - **Transport Abstraction**: pluggable link to the watch (mock included)
//! - **Push-style sources**: sources publish whole lists; unchanged lists are free
//! - **Pure State Machine**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{AgendaService, MockTransport, SourceRegistry};
//!
//! let (link_tx, link_rx) = tokio::sync::mpsc::unbounded_channel();
//! let (service, handle) = AgendaService::new(config, settings, MockTransport::new(), link_rx);
//! tokio::spawn(service.with_registry(registry).run());
//!
//! handle.publish(source_id, items, false).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calendar;
pub mod error;
pub mod notifier;
pub mod registry;
pub mod service;
pub mod transport;

pub use calendar::{calendar_items, CalendarConfig, CalendarEvent, CalendarLayout, CalendarSource, LineContent};
pub use error::ServiceError;
pub use notifier::{LogNotifier, Notifier, RecordingNotifier};
pub use registry::{DataSource, Publisher, SourceRegistry, StaticSource};
pub use service::{spawn, AgendaService, ServiceHandle};
pub use transport::{MockTransport, SentMessage, Transport, TransportError, TransportEvent};
