//! Domain types shared by the CTF sync services.
//!
//! Everything in here is pure data and string handling: the catalog event
//! model, the channel topic codec and the display-key rules used to match
//! catalog titles against chat platform names.

pub mod event;
pub mod title;
pub mod topic;

pub use event::{parse_catalog_timestamp, Event, EventDetails, EventSummary, TimestampError};
pub use title::{display_key, truncate_chars, DESCRIPTION_LIMIT, DISPLAY_KEY_LIMIT};
pub use topic::{decode_params, ChannelTopic, TopicError};

/// Channels created inside every new event category, in creation order.
pub const DEFAULT_CHANNELS: [&str; 6] = ["general", "pwn", "rev", "web", "crypto", "misc"];
