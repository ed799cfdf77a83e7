//! SvVis message model and wire codec.
//!
//! A message is one channel byte followed by a payload whose length the
//! channel implies:
//! - channel 10 carries a NUL-terminated string of at most 31 bytes
//! - channels 11..=19 carry a little-endian `i16`
//! - channels 21..=29 carry a little-endian `f32`
//! - every other channel carries nothing
//!
//! There is no length prefix and no resynchronization. Both ends must agree
//! on the channel table.

pub mod channel;
pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use channel::{
    channel_name, float_channel, int16_channel, payload_len, ChannelKind, CHANNEL_COUNT,
    FLOAT_BASE, INT16_BASE, MAX_PAYLOAD, MAX_STRING_LEN, STRING,
};
pub use codec::{decode_message, encode_message, MessageDecoder};
pub use error::{FrameError, Result};
pub use message::{Message, Payload};
pub use reader::{read_message, MessageReader};
pub use writer::{write_message, MessageWriter};

#[cfg(feature = "async")]
pub use async_codec::SvVisCodec;
