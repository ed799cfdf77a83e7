//! Channel numbers and their payload classification.
//!
//! A channel is one byte. One value carries strings, two blocks of
//! [`CHANNEL_COUNT`] values carry 16-bit integers and 32-bit floats, and every
//! other value is unknown with an empty payload. The payload length of a
//! message is a pure function of its channel byte.

/// Maximum payload size in bytes, including a string's NUL terminator.
pub const MAX_PAYLOAD: usize = 32;

/// Maximum string content in bytes (one byte is reserved for the NUL).
pub const MAX_STRING_LEN: usize = MAX_PAYLOAD - 1;

/// Number of channels in each numeric block.
pub const CHANNEL_COUNT: u8 = 9;

/// NUL-terminated string messages.
pub const STRING: u8 = 10;

/// First 16-bit signed integer channel.
pub const INT16_BASE: u8 = 11;

/// First 32-bit IEEE-754 float channel.
pub const FLOAT_BASE: u8 = 21;

/// Payload interpretation selected by a channel byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// The string channel.
    String,
    /// Integer channel with its index in `0..CHANNEL_COUNT`.
    Int16(u8),
    /// Float channel with its index in `0..CHANNEL_COUNT`.
    Float(u8),
    /// Any other channel; zero-length payload.
    Unknown,
}

impl ChannelKind {
    /// Classify a channel byte. Total over all 256 values.
    pub fn of(channel: u8) -> Self {
        if channel == STRING {
            ChannelKind::String
        } else if (INT16_BASE..INT16_BASE + CHANNEL_COUNT).contains(&channel) {
            ChannelKind::Int16(channel - INT16_BASE)
        } else if (FLOAT_BASE..FLOAT_BASE + CHANNEL_COUNT).contains(&channel) {
            ChannelKind::Float(channel - FLOAT_BASE)
        } else {
            ChannelKind::Unknown
        }
    }

    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::String => "STRING",
            ChannelKind::Int16(_) => "INT16",
            ChannelKind::Float(_) => "FLOAT",
            ChannelKind::Unknown => "UNKNOWN",
        }
    }
}

/// Payload length implied by a channel byte.
///
/// Strings are variable length; their maximum, [`MAX_PAYLOAD`], is returned.
pub fn payload_len(channel: u8) -> usize {
    match ChannelKind::of(channel) {
        ChannelKind::String => MAX_PAYLOAD,
        ChannelKind::Int16(_) => std::mem::size_of::<i16>(),
        ChannelKind::Float(_) => std::mem::size_of::<f32>(),
        ChannelKind::Unknown => 0,
    }
}

/// Channel byte for integer channel `index`, if the index is in range.
pub fn int16_channel(index: u8) -> Option<u8> {
    (index < CHANNEL_COUNT).then(|| INT16_BASE + index)
}

/// Channel byte for float channel `index`, if the index is in range.
pub fn float_channel(index: u8) -> Option<u8> {
    (index < CHANNEL_COUNT).then(|| FLOAT_BASE + index)
}

/// Returns a human-readable name for a channel byte.
pub fn channel_name(channel: u8) -> &'static str {
    ChannelKind::of(channel).name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_of_block_edges() {
        assert_eq!(ChannelKind::of(STRING), ChannelKind::String);
        assert_eq!(ChannelKind::of(INT16_BASE), ChannelKind::Int16(0));
        assert_eq!(ChannelKind::of(INT16_BASE + 8), ChannelKind::Int16(8));
        assert_eq!(ChannelKind::of(INT16_BASE + 9), ChannelKind::Unknown);
        assert_eq!(ChannelKind::of(FLOAT_BASE), ChannelKind::Float(0));
        assert_eq!(ChannelKind::of(FLOAT_BASE + 8), ChannelKind::Float(8));
        assert_eq!(ChannelKind::of(FLOAT_BASE + 9), ChannelKind::Unknown);
        assert_eq!(ChannelKind::of(0), ChannelKind::Unknown);
        assert_eq!(ChannelKind::of(255), ChannelKind::Unknown);
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(payload_len(STRING), MAX_PAYLOAD);
        assert_eq!(payload_len(INT16_BASE + 2), 2);
        assert_eq!(payload_len(FLOAT_BASE + 3), 4);
        assert_eq!(payload_len(9), 0);
    }

    #[test]
    fn index_helpers_reject_out_of_range() {
        assert_eq!(int16_channel(2), Some(13));
        assert_eq!(float_channel(0), Some(21));
        assert_eq!(int16_channel(CHANNEL_COUNT), None);
        assert_eq!(float_channel(200), None);
    }

    #[test]
    fn names() {
        assert_eq!(channel_name(STRING), "STRING");
        assert_eq!(channel_name(12), "INT16");
        assert_eq!(channel_name(22), "FLOAT");
        assert_eq!(channel_name(1), "UNKNOWN");
    }
}
