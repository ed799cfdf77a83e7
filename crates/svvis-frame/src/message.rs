use std::fmt;

use bytes::{BufMut, Bytes};

use crate::channel::{
    float_channel, int16_channel, ChannelKind, CHANNEL_COUNT, MAX_PAYLOAD, MAX_STRING_LEN, STRING,
};
use crate::error::{FrameError, Result};

/// Payload of a message, interpreted according to its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// String content without the NUL terminator, at most [`MAX_STRING_LEN`] bytes.
    Text(Bytes),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit IEEE-754 float.
    F32(f32),
    /// Payload of an unknown channel (empty on a conforming link).
    Raw(Bytes),
}

/// One SvVis message: a channel byte and its payload.
///
/// The payload variant always matches the channel classification; the
/// constructors enforce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    channel: u8,
    payload: Payload,
}

impl Message {
    /// A string message.
    ///
    /// Content ends at the first NUL byte and is truncated to
    /// [`MAX_STRING_LEN`] bytes so the terminated form fits [`MAX_PAYLOAD`].
    pub fn string(text: impl AsRef<[u8]>) -> Self {
        let text = text.as_ref();
        let end = text
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(text.len())
            .min(MAX_STRING_LEN);
        Self {
            channel: STRING,
            payload: Payload::Text(Bytes::copy_from_slice(&text[..end])),
        }
    }

    /// A 16-bit integer message on integer channel `index` (`0..CHANNEL_COUNT`).
    pub fn int16(index: u8, value: i16) -> Result<Self> {
        let channel = int16_channel(index).ok_or(FrameError::InvalidChannel {
            index,
            max: CHANNEL_COUNT,
        })?;
        Ok(Self {
            channel,
            payload: Payload::I16(value),
        })
    }

    /// A float message on float channel `index` (`0..CHANNEL_COUNT`).
    pub fn float(index: u8, value: f32) -> Result<Self> {
        let channel = float_channel(index).ok_or(FrameError::InvalidChannel {
            index,
            max: CHANNEL_COUNT,
        })?;
        Ok(Self {
            channel,
            payload: Payload::F32(value),
        })
    }

    /// Rebuild a message from a zero-padded receive buffer.
    ///
    /// `len` is the number of payload bytes actually received.
    pub(crate) fn from_wire(channel: u8, buf: &[u8; MAX_PAYLOAD], len: usize) -> Self {
        let len = len.min(MAX_PAYLOAD);
        let payload = match ChannelKind::of(channel) {
            ChannelKind::String => Payload::Text(Bytes::copy_from_slice(&buf[..len.min(MAX_STRING_LEN)])),
            ChannelKind::Int16(_) => Payload::I16(i16::from_le_bytes([buf[0], buf[1]])),
            ChannelKind::Float(_) => {
                Payload::F32(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
            }
            ChannelKind::Unknown => Payload::Raw(Bytes::copy_from_slice(&buf[..len])),
        };
        Self { channel, payload }
    }

    /// The channel byte.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Classification of the channel.
    pub fn kind(&self) -> ChannelKind {
        ChannelKind::of(self.channel)
    }

    /// The payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns true for string messages.
    pub fn is_string(&self) -> bool {
        self.channel == STRING
    }

    /// String content without the terminator, if this is a string message.
    pub fn text(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    /// String content as UTF-8, if this is a string message with valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.text().and_then(|text| std::str::from_utf8(text).ok())
    }

    /// Integer value, if this is an integer message.
    pub fn as_i16(&self) -> Option<i16> {
        match self.payload {
            Payload::I16(value) => Some(value),
            _ => None,
        }
    }

    /// Float value, if this is a float message.
    pub fn as_f32(&self) -> Option<f32> {
        match self.payload {
            Payload::F32(value) => Some(value),
            _ => None,
        }
    }

    /// Number of payload bytes on the wire (a string counts its NUL).
    pub fn wire_len(&self) -> usize {
        match &self.payload {
            Payload::Text(text) => text.len() + 1,
            Payload::I16(_) => 2,
            Payload::F32(_) => 4,
            Payload::Raw(raw) => raw.len(),
        }
    }

    /// Total bytes on the wire including the channel byte.
    pub fn wire_size(&self) -> usize {
        1 + self.wire_len()
    }

    /// Append the payload bytes in wire form (little-endian numbers).
    pub fn put_payload<B: BufMut>(&self, dst: &mut B) {
        match &self.payload {
            Payload::Text(text) => {
                dst.put_slice(text);
                dst.put_u8(0);
            }
            Payload::I16(value) => dst.put_i16_le(*value),
            Payload::F32(value) => dst.put_f32_le(*value),
            Payload::Raw(raw) => dst.put_slice(raw),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => write!(f, "{}", String::from_utf8_lossy(text)),
            Payload::I16(value) => write!(f, "{value}"),
            Payload::F32(value) => write!(f, "{value}"),
            Payload::Raw(raw) => write!(f, "<raw {} bytes>", raw.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::channel::{FLOAT_BASE, INT16_BASE};

    #[test]
    fn string_constructor_truncates() {
        let long = "x".repeat(40);
        let msg = Message::string(&long);
        assert_eq!(msg.text().unwrap().len(), MAX_STRING_LEN);
        assert_eq!(msg.wire_len(), MAX_PAYLOAD);
    }

    #[test]
    fn string_constructor_stops_at_nul() {
        let msg = Message::string(b"ab\0cd");
        assert_eq!(msg.text(), Some(&b"ab"[..]));
        assert_eq!(msg.wire_len(), 3);
    }

    #[test]
    fn numeric_constructors_map_indexes() {
        let msg = Message::int16(2, -17).unwrap();
        assert_eq!(msg.channel(), INT16_BASE + 2);
        assert_eq!(msg.as_i16(), Some(-17));
        assert_eq!(msg.kind(), ChannelKind::Int16(2));

        let msg = Message::float(8, 0.25).unwrap();
        assert_eq!(msg.channel(), FLOAT_BASE + 8);
        assert_eq!(msg.as_f32(), Some(0.25));
    }

    #[test]
    fn out_of_range_index_rejected() {
        assert!(matches!(
            Message::int16(9, 1),
            Err(FrameError::InvalidChannel { index: 9, .. })
        ));
        assert!(matches!(
            Message::float(10, 1.0),
            Err(FrameError::InvalidChannel { index: 10, .. })
        ));
    }

    #[test]
    fn payload_is_little_endian() {
        let mut buf = BytesMut::new();
        Message::int16(2, -17).unwrap().put_payload(&mut buf);
        assert_eq!(buf.as_ref(), &[0xEF, 0xFF]);

        buf.clear();
        Message::float(0, 1.0).unwrap().put_payload(&mut buf);
        assert_eq!(buf.as_ref(), &[0x00, 0x00, 0x80, 0x3F]);

        buf.clear();
        Message::string("help").put_payload(&mut buf);
        assert_eq!(buf.as_ref(), b"help\0");
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let msg = Message::string("fw 100");
        assert_eq!(msg.as_str(), Some("fw 100"));
        assert!(msg.as_i16().is_none());
        assert!(msg.as_f32().is_none());
        assert!(msg.is_string());
    }

    #[test]
    fn display_payloads() {
        assert_eq!(Message::string("stop").payload().to_string(), "stop");
        assert_eq!(Message::int16(0, 42).unwrap().payload().to_string(), "42");
        assert_eq!(Payload::Raw(Bytes::new()).to_string(), "<raw 0 bytes>");
    }
}
