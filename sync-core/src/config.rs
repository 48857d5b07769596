//! Engine tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol limits and timings.
///
/// Every field has a default, so an empty `[engine]` table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of items per sync (capped at 255 on the wire).
    pub max_items: usize,
    /// Version of the watch application bundled with this phone build.
    pub bundled_version: u8,
    /// Oldest watch version this engine can talk to.
    pub min_supported_version: u8,
    /// Resends allowed per message before the transfer is abandoned.
    pub max_retries: u32,
    /// Delay before resending a nacked message.
    pub resend_delay_ms: u64,
    /// Startup window during which peer requests are ignored.
    pub initial_data_wait_ms: u64,
    /// Minimum spacing between update prompts.
    pub notification_interval_secs: u64,
    /// How often sources are asked to refresh.
    pub source_refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            bundled_version: 9,
            min_supported_version: 8,
            max_retries: 2,
            resend_delay_ms: 3_000,
            initial_data_wait_ms: 2_000,
            notification_interval_secs: 60 * 60,
            source_refresh_interval_secs: 30 * 60,
        }
    }
}

impl EngineConfig {
    /// Item limit after applying the one-byte wire count.
    pub fn effective_max_items(&self) -> usize {
        self.max_items.min(usize::from(u8::MAX))
    }

    /// Resend delay as a [`Duration`].
    pub fn resend_delay(&self) -> Duration {
        Duration::from_millis(self.resend_delay_ms)
    }

    /// Startup window as a [`Duration`].
    pub fn initial_data_wait(&self) -> Duration {
        Duration::from_millis(self.initial_data_wait_ms)
    }

    /// Source refresh period as a [`Duration`].
    pub fn source_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.source_refresh_interval_secs)
    }

    pub(crate) fn notification_interval(&self) -> chrono::Duration {
        let secs = i64::try_from(self.notification_interval_secs).unwrap_or(i64::MAX);
        chrono::Duration::seconds(secs.min(i64::MAX / 1_000))
    }
}
