//! Protocol messages for agenda-sync.
//!
//! Phone → watch messages are built as [`Message`] values and lowered to a
//! [`Dictionary`] for the transport. Watch → phone traffic is a single kind
//! of request, decoded into a [`PeerRequest`].

use crate::{AgendaItem, CodecError, Dictionary, DisplaySettings, Line, SyncId, VibratePattern};

/// Longest string (in characters) the watch accepts per line.
pub const MAX_STRING_LEN: usize = 50;

/// Items whose two sendable texts together are shorter than this many bytes
/// travel in one message; larger items are split into two halves.
pub const SINGLE_MESSAGE_THRESHOLD: usize = 40;

/// Minimum version the peer expects of us when its request does not say.
pub const DEFAULT_PEER_MIN_VERSION: u8 = 4;

const ELLIPSIS: &str = "...";

/// Dictionary keys.
pub mod keys {
    /// Command discriminator (u8).
    pub const COMMAND: u32 = 0;
    /// Minimum supported watch version (u8), init only.
    pub const VERSION: u32 = 1;
    /// Sync id (u8), init only.
    pub const SYNC_ID: u32 = 2;
    /// Line 1 text.
    pub const TEXT1: u32 = 1;
    /// Line 2 text.
    pub const TEXT2: u32 = 2;
    /// Line 1 style byte.
    pub const DESIGN1: u32 = 3;
    /// Line 2 style byte.
    pub const DESIGN2: u32 = 4;
    /// Item index within a sync (u8).
    pub const INDEX: u32 = 5;
    /// Vibration pattern (u8), done only.
    pub const VIBRATE: u32 = 6;
    /// Number of items advertised (u8), init only.
    pub const NUM_ITEMS: u32 = 10;
    /// Start time (i32, wire format).
    pub const START_TIME: u32 = 20;
    /// End time (i32, wire format).
    pub const END_TIME: u32 = 30;
    /// Settings flags (u32), init only.
    pub const SETTINGS: u32 = 40;

    /// Watch → phone: current watch version.
    pub const PEER_VERSION: u32 = 0;
    /// Watch → phone: minimum phone version the watch needs.
    pub const PEER_MIN_VERSION: u32 = 1;
    /// Watch → phone: id of the last sync the watch holds.
    pub const PEER_LAST_SYNC_ID: u32 = 2;
}

/// Command discriminator for phone → watch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Start of a sync: item count, sync id, version, settings.
    Init = 0,
    /// A complete item in one message.
    Item = 1,
    /// End of a sync.
    Done = 2,
    /// The watch already holds the current data.
    NoNewData = 4,
    /// Ask the watch to send a request.
    ForceRequest = 5,
    /// First half of a split item.
    ItemHalf1 = 6,
    /// Second half of a split item.
    ItemHalf2 = 7,
}

impl TryFrom<u8> for Command {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Command::Init),
            1 => Ok(Command::Item),
            2 => Ok(Command::Done),
            4 => Ok(Command::NoNewData),
            5 => Ok(Command::ForceRequest),
            6 => Ok(Command::ItemHalf1),
            7 => Ok(Command::ItemHalf2),
            _ => Err(CodecError::InvalidCommand(value)),
        }
    }
}

/// Truncate text to what the watch accepts, marking the cut with `...`.
pub fn sendable_text(text: &str) -> String {
    if text.chars().count() <= MAX_STRING_LEN {
        return text.to_string();
    }
    let mut cut: String = text
        .chars()
        .take(MAX_STRING_LEN - ELLIPSIS.len() - 1)
        .collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// Style byte for a line (`line_no` is 1 or 2).
///
/// A hidden line encodes as `0`; visible lines always carry bit 0 so that
/// "visible with default styling" is distinguishable from hidden. Unset
/// time display, countdown and overflow fall back to `settings`.
pub fn style_byte(line: Option<&Line>, line_no: u8, settings: &DisplaySettings) -> u8 {
    let Some(line) = line else {
        return 0;
    };
    let mut style = 0x01u8;
    if line.bold {
        style |= 0x20;
    }
    let overflow = line.overflow.unwrap_or_else(|| settings.overflow_for(line_no));
    style |= (overflow as u8 & 0x03) << 6;

    let time_display = line
        .time_display
        .unwrap_or_else(|| settings.time_display_for(line_no));
    style |= (time_display as u8 & 0x07) << 1;
    if time_display != crate::TimeDisplay::None
        && line.show_countdown.unwrap_or(settings.countdown)
    {
        style |= 0x10;
    }
    style
}

/// Whether an item can be sent in a single message.
pub fn fits_single_message(item: &AgendaItem) -> bool {
    let line1 = sendable_text(&item.line1().text).len();
    let line2 = item
        .line2()
        .map(|line| sendable_text(&line.text).len())
        .unwrap_or(0);
    line1 + line2 < SINGLE_MESSAGE_THRESHOLD
}

/// The wire view of one item: truncated texts, style bytes and wire times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPayload {
    /// Sendable line 1 text.
    pub text1: String,
    /// Line 1 style byte.
    pub style1: u8,
    /// Sendable line 2 text (empty if the line is hidden).
    pub text2: String,
    /// Line 2 style byte (0 if hidden).
    pub style2: u8,
    /// Start time, wire format.
    pub start: i32,
    /// End time, wire format.
    pub end: i32,
}

impl ItemPayload {
    /// Lower an item to its wire view.
    pub fn from_item(item: &AgendaItem, settings: &DisplaySettings) -> Self {
        Self {
            text1: sendable_text(&item.line1().text),
            style1: style_byte(Some(item.line1()), 1, settings),
            text2: item
                .line2()
                .map(|line| sendable_text(&line.text))
                .unwrap_or_default(),
            style2: style_byte(item.line2(), 2, settings),
            start: item.start_wire_time(),
            end: item.end_wire_time(),
        }
    }
}

/// Phone → watch messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Announce a new dataset.
    Init {
        /// Number of items that will follow.
        item_count: u8,
        /// Id of the dataset being sent.
        sync_id: SyncId,
        /// Minimum watch version we support.
        min_version: u8,
        /// Settings flags word.
        settings: u32,
    },
    /// The watch's dataset is current.
    NoNewData,
    /// The dataset is complete.
    Done {
        /// Vibration the watch should play.
        vibrate: VibratePattern,
    },
    /// Ask the watch to send a request.
    ForceRequest,
    /// A whole item.
    Item {
        /// Position in the dataset.
        index: u8,
        /// Wire view of the item.
        payload: ItemPayload,
    },
    /// Line 1 and start time of a split item.
    ItemHalf1 {
        /// Position in the dataset.
        index: u8,
        /// Sendable line 1 text.
        text1: String,
        /// Line 1 style byte.
        style1: u8,
        /// Start time, wire format.
        start: i32,
    },
    /// Line 2 and end time of a split item.
    ItemHalf2 {
        /// Position in the dataset.
        index: u8,
        /// Sendable line 2 text.
        text2: String,
        /// Line 2 style byte.
        style2: u8,
        /// End time, wire format.
        end: i32,
    },
}

impl Message {
    /// First half of a split item.
    pub fn first_half(index: u8, payload: &ItemPayload) -> Self {
        Message::ItemHalf1 {
            index,
            text1: payload.text1.clone(),
            style1: payload.style1,
            start: payload.start,
        }
    }

    /// Second half of a split item.
    pub fn second_half(index: u8, payload: &ItemPayload) -> Self {
        Message::ItemHalf2 {
            index,
            text2: payload.text2.clone(),
            style2: payload.style2,
            end: payload.end,
        }
    }

    /// The command discriminator.
    pub fn command(&self) -> Command {
        match self {
            Message::Init { .. } => Command::Init,
            Message::NoNewData => Command::NoNewData,
            Message::Done { .. } => Command::Done,
            Message::ForceRequest => Command::ForceRequest,
            Message::Item { .. } => Command::Item,
            Message::ItemHalf1 { .. } => Command::ItemHalf1,
            Message::ItemHalf2 { .. } => Command::ItemHalf2,
        }
    }

    /// Lower to the wire dictionary.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.put_u8(keys::COMMAND, self.command() as u8);
        match self {
            Message::Init {
                item_count,
                sync_id,
                min_version,
                settings,
            } => {
                dict.put_u8(keys::NUM_ITEMS, *item_count)
                    .put_u8(keys::SYNC_ID, sync_id.value())
                    .put_u8(keys::VERSION, *min_version)
                    .put_u32(keys::SETTINGS, *settings);
            }
            Message::NoNewData | Message::ForceRequest => {}
            Message::Done { vibrate } => {
                dict.put_u8(keys::VIBRATE, *vibrate as u8);
            }
            Message::Item { index, payload } => {
                dict.put_u8(keys::INDEX, *index)
                    .put_str(keys::TEXT1, payload.text1.as_str())
                    .put_str(keys::TEXT2, payload.text2.as_str())
                    .put_u8(keys::DESIGN1, payload.style1)
                    .put_u8(keys::DESIGN2, payload.style2)
                    .put_i32(keys::START_TIME, payload.start)
                    .put_i32(keys::END_TIME, payload.end);
            }
            Message::ItemHalf1 {
                index,
                text1,
                style1,
                start,
            } => {
                dict.put_u8(keys::INDEX, *index)
                    .put_str(keys::TEXT1, text1.as_str())
                    .put_u8(keys::DESIGN1, *style1)
                    .put_i32(keys::START_TIME, *start);
            }
            Message::ItemHalf2 {
                index,
                text2,
                style2,
                end,
            } => {
                dict.put_u8(keys::INDEX, *index)
                    .put_str(keys::TEXT2, text2.as_str())
                    .put_u8(keys::DESIGN2, *style2)
                    .put_i32(keys::END_TIME, *end);
            }
        }
        dict
    }

    /// Parse a phone → watch dictionary (the watch side of the codec).
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self, CodecError> {
        let command = Command::try_from(required_u8(dict, keys::COMMAND)?)?;
        let message = match command {
            Command::Init => Message::Init {
                item_count: required_u8(dict, keys::NUM_ITEMS)?,
                sync_id: SyncId::new(required_u8(dict, keys::SYNC_ID)?),
                min_version: required_u8(dict, keys::VERSION)?,
                settings: required_int(dict, keys::SETTINGS)
                    .and_then(|v| narrow(keys::SETTINGS, v))?,
            },
            Command::NoNewData => Message::NoNewData,
            Command::ForceRequest => Message::ForceRequest,
            Command::Done => Message::Done {
                vibrate: match required_u8(dict, keys::VIBRATE)? {
                    0 => VibratePattern::None,
                    1 => VibratePattern::Short,
                    2 => VibratePattern::TwiceShort,
                    3 => VibratePattern::Long,
                    other => {
                        return Err(CodecError::InvalidValue {
                            key: keys::VIBRATE,
                            reason: format!("unknown vibrate pattern {other}"),
                        })
                    }
                },
            },
            Command::Item => Message::Item {
                index: required_u8(dict, keys::INDEX)?,
                payload: ItemPayload {
                    text1: required_str(dict, keys::TEXT1)?,
                    style1: required_u8(dict, keys::DESIGN1)?,
                    text2: required_str(dict, keys::TEXT2)?,
                    style2: required_u8(dict, keys::DESIGN2)?,
                    start: required_i32(dict, keys::START_TIME)?,
                    end: required_i32(dict, keys::END_TIME)?,
                },
            },
            Command::ItemHalf1 => Message::ItemHalf1 {
                index: required_u8(dict, keys::INDEX)?,
                text1: required_str(dict, keys::TEXT1)?,
                style1: required_u8(dict, keys::DESIGN1)?,
                start: required_i32(dict, keys::START_TIME)?,
            },
            Command::ItemHalf2 => Message::ItemHalf2 {
                index: required_u8(dict, keys::INDEX)?,
                text2: required_str(dict, keys::TEXT2)?,
                style2: required_u8(dict, keys::DESIGN2)?,
                end: required_i32(dict, keys::END_TIME)?,
            },
        };
        Ok(message)
    }
}

/// A sync request from the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRequest {
    /// Version of the watch application.
    pub version: u8,
    /// Minimum phone-side version the watch requires.
    pub min_version: u8,
    /// Id of the dataset the watch currently holds (`0` = unknown).
    pub last_sync_id: SyncId,
}

impl PeerRequest {
    /// Decode an inbound request.
    ///
    /// The version is required; the minimum version defaults to
    /// [`DEFAULT_PEER_MIN_VERSION`] and the sync id to unknown.
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self, CodecError> {
        let version = required_u8(dict, keys::PEER_VERSION)?;
        let min_version = match dict.get_integer(keys::PEER_MIN_VERSION)? {
            Some(v) => narrow(keys::PEER_MIN_VERSION, v)?,
            None => DEFAULT_PEER_MIN_VERSION,
        };
        let last_sync_id = match dict.get_integer(keys::PEER_LAST_SYNC_ID)? {
            Some(v) => SyncId::new(narrow(keys::PEER_LAST_SYNC_ID, v)?),
            None => SyncId::UNKNOWN,
        };
        Ok(Self {
            version,
            min_version,
            last_sync_id,
        })
    }

    /// Encode as the watch would send it.
    pub fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.put_u8(keys::PEER_VERSION, self.version)
            .put_u8(keys::PEER_MIN_VERSION, self.min_version)
            .put_u8(keys::PEER_LAST_SYNC_ID, self.last_sync_id.value());
        dict
    }
}

fn required_int(dict: &Dictionary, key: u32) -> Result<i64, CodecError> {
    dict.get_integer(key)?.ok_or(CodecError::MissingKey(key))
}

fn required_u8(dict: &Dictionary, key: u32) -> Result<u8, CodecError> {
    required_int(dict, key).and_then(|v| narrow(key, v))
}

fn required_i32(dict: &Dictionary, key: u32) -> Result<i32, CodecError> {
    required_int(dict, key).and_then(|v| narrow(key, v))
}

fn required_str(dict: &Dictionary, key: u32) -> Result<String, CodecError> {
    dict.get_str(key)
        .map(str::to_string)
        .ok_or(CodecError::MissingKey(key))
}

fn narrow<T: TryFrom<i64>>(key: u32, value: i64) -> Result<T, CodecError> {
    T::try_from(value).map_err(|_| CodecError::InvalidValue {
        key,
        reason: format!("{value} out of range"),
    })
}
