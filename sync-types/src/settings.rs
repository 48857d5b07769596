//! User display preferences sent to, and consulted on behalf of, the watch.
//!
//! These are passed explicitly into the codec. The settings bitmask layout is
//! a contract with the watch firmware and must not be reordered.

use serde::{Deserialize, Serialize};

use crate::{Overflow, TimeDisplay};

/// Vibration pattern carried by the "done" message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VibratePattern {
    /// Do not vibrate.
    None = 0,
    /// One short pulse.
    #[default]
    Short = 1,
    /// Two short pulses.
    TwiceShort = 2,
    /// One long pulse.
    Long = 3,
}

/// Display preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Show the header row (clock and date).
    pub show_header: bool,
    /// Use a 12-hour clock.
    pub clock_12h: bool,
    /// Show an am/pm marker with the 12-hour clock.
    pub show_am_pm: bool,
    /// Item font size tier (0..=3).
    pub font_size: u8,
    /// Header time size tier (0..=3).
    pub header_time_size: u8,
    /// Insert date separators between days.
    pub date_separator: bool,
    /// Enable scrolling through items.
    pub scrolling: bool,
    /// Scroll continuously instead of page-wise.
    pub continuous_scroll: bool,
    /// Default countdown flag for lines that do not set one.
    pub countdown: bool,
    /// Default time display for line 1.
    pub line1_time_display: TimeDisplay,
    /// Default time display for line 2.
    pub line2_time_display: TimeDisplay,
    /// Default overflow behaviour for line 1.
    pub line1_overflow: Overflow,
    /// Default overflow behaviour for line 2.
    pub line2_overflow: Overflow,
    /// Pattern used when a source asked for a vibration.
    pub vibrate_pattern: VibratePattern,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_header: true,
            clock_12h: false,
            show_am_pm: true,
            font_size: 0,
            header_time_size: 0,
            date_separator: false,
            scrolling: true,
            continuous_scroll: true,
            countdown: false,
            line1_time_display: TimeDisplay::None,
            line2_time_display: TimeDisplay::Relative,
            line1_overflow: Overflow::None,
            line2_overflow: Overflow::None,
            vibrate_pattern: VibratePattern::Short,
        }
    }
}

impl DisplaySettings {
    /// Pack the general settings into the 32-bit flags word.
    pub fn bitmask(&self) -> u32 {
        let mut flags = 0u32;
        if self.show_header {
            flags |= 0x01;
        }
        if self.clock_12h {
            flags |= 0x02;
        }
        if self.show_am_pm {
            flags |= 0x04;
        }
        if self.font_size % 2 == 1 {
            flags |= 0x20;
        }
        if self.font_size > 1 {
            flags |= 0x40;
        }
        if self.header_time_size % 2 == 1 {
            flags |= 0x80;
        }
        if self.header_time_size > 1 {
            flags |= 0x100;
        }
        if self.date_separator {
            flags |= 0x200;
        }
        if self.scrolling {
            flags |= 0x400;
        }
        if self.countdown {
            flags |= 0x800;
        }
        if self.continuous_scroll {
            flags |= 0x1000;
        }
        flags
    }

    /// Default time display for a line (1 or 2).
    pub fn time_display_for(&self, line: u8) -> TimeDisplay {
        if line == 1 {
            self.line1_time_display
        } else {
            self.line2_time_display
        }
    }

    /// Default overflow for a line (1 or 2).
    pub fn overflow_for(&self, line: u8) -> Overflow {
        if line == 1 {
            self.line1_overflow
        } else {
            self.line2_overflow
        }
    }
}
