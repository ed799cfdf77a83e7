use bytes::{Buf, BufMut, BytesMut};

use crate::channel::{ChannelKind, MAX_PAYLOAD, MAX_STRING_LEN};
use crate::message::Message;

/// Encode a message into its wire form.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────────────────────┐
/// │ Channel (1B) │ Payload                                  │
/// │              │ STRING: content + 0x00 (2..=32 bytes)    │
/// │              │ INT16:  2 bytes LE                       │
/// │              │ FLOAT:  4 bytes LE (IEEE-754)            │
/// │              │ other:  nothing                          │
/// └──────────────┴──────────────────────────────────────────┘
/// ```
/// There is no length prefix and no synchronization marker. The receiver
/// recovers message boundaries purely from the channel byte.
pub fn encode_message(msg: &Message, dst: &mut BytesMut) {
    dst.reserve(msg.wire_size());
    dst.put_u8(msg.channel());
    msg.put_payload(dst);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Channel,
    Fixed(usize),
    Text,
}

/// Incremental byte-at-a-time message decoder.
///
/// Feed every received byte to [`push`](Self::push); a complete message is
/// returned on the byte that finishes it. The payload buffer is zeroed at
/// the start of each message. String bytes past [`MAX_STRING_LEN`] are
/// consumed and discarded until the NUL terminator arrives.
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    state: DecodeState,
    channel: u8,
    buf: [u8; MAX_PAYLOAD],
    len: usize,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Channel,
            channel: 0,
            buf: [0; MAX_PAYLOAD],
            len: 0,
        }
    }

    /// Consume one byte. Returns the message it completes, if any.
    pub fn push(&mut self, byte: u8) -> Option<Message> {
        match self.state {
            DecodeState::Channel => {
                self.channel = byte;
                self.buf = [0; MAX_PAYLOAD];
                self.len = 0;
                match ChannelKind::of(byte) {
                    ChannelKind::String => self.state = DecodeState::Text,
                    ChannelKind::Int16(_) => self.state = DecodeState::Fixed(2),
                    ChannelKind::Float(_) => self.state = DecodeState::Fixed(4),
                    ChannelKind::Unknown => return Some(self.finish()),
                }
                None
            }
            DecodeState::Fixed(needed) => {
                self.buf[self.len] = byte;
                self.len += 1;
                (self.len == needed).then(|| self.finish())
            }
            DecodeState::Text => {
                if byte == 0 {
                    return Some(self.finish());
                }
                if self.len < MAX_STRING_LEN {
                    self.buf[self.len] = byte;
                    self.len += 1;
                }
                None
            }
        }
    }

    /// Returns true between messages.
    pub fn is_idle(&self) -> bool {
        self.state == DecodeState::Channel
    }

    /// Discard any partially received message.
    pub fn reset(&mut self) {
        self.state = DecodeState::Channel;
        self.len = 0;
    }

    fn finish(&mut self) -> Message {
        self.state = DecodeState::Channel;
        Message::from_wire(self.channel, &self.buf, self.len)
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one message from the front of a buffer.
///
/// Returns `None` if the buffer doesn't hold a complete message yet; the
/// buffer is left untouched in that case. On success the message bytes are
/// consumed.
pub fn decode_message(src: &mut BytesMut) -> Option<Message> {
    let mut decoder = MessageDecoder::new();
    for (i, &byte) in src.iter().enumerate() {
        if let Some(msg) = decoder.push(byte) {
            src.advance(i + 1);
            return Some(msg);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{FLOAT_BASE, INT16_BASE, STRING};
    use crate::message::Payload;

    fn decode_all(bytes: &[u8]) -> Vec<Message> {
        let mut decoder = MessageDecoder::new();
        bytes.iter().filter_map(|&b| decoder.push(b)).collect()
    }

    #[test]
    fn encode_each_kind() {
        let mut buf = BytesMut::new();
        encode_message(&Message::string("help"), &mut buf);
        encode_message(&Message::int16(2, -17).unwrap(), &mut buf);
        encode_message(&Message::float(0, 1.0).unwrap(), &mut buf);
        assert_eq!(
            buf.as_ref(),
            &[
                STRING, b'h', b'e', b'l', b'p', 0, //
                INT16_BASE + 2, 0xEF, 0xFF, //
                FLOAT_BASE, 0x00, 0x00, 0x80, 0x3F,
            ]
        );
    }

    #[test]
    fn decode_mixed_stream() {
        let msgs = decode_all(&[0x0A, b'h', b'i', 0x00, 0x0D, 0xEF, 0xFF]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].as_str(), Some("hi"));
        assert_eq!(msgs[1].channel(), 13);
        assert_eq!(msgs[1].as_i16(), Some(-17));
    }

    #[test]
    fn unknown_channel_completes_immediately() {
        let mut decoder = MessageDecoder::new();
        let msg = decoder.push(0x05).unwrap();
        assert_eq!(msg.channel(), 5);
        assert_eq!(msg.payload(), &Payload::Raw(bytes::Bytes::new()));
        assert_eq!(msg.wire_len(), 0);
        assert!(decoder.is_idle());
    }

    #[test]
    fn overlong_string_is_truncated_and_drained() {
        let mut wire = vec![STRING];
        wire.extend(std::iter::repeat(b'a').take(40));
        wire.push(0);
        wire.extend_from_slice(&[INT16_BASE, 1, 0]);

        let msgs = decode_all(&wire);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].text().unwrap().len(), MAX_STRING_LEN);
        assert_eq!(msgs[1].as_i16(), Some(1));
    }

    #[test]
    fn empty_string_decodes() {
        let msgs = decode_all(&[STRING, 0]);
        assert_eq!(msgs[0].text(), Some(&b""[..]));
    }

    #[test]
    fn buffer_is_zeroed_between_messages() {
        let msgs = decode_all(&[STRING, b'x', b'y', 0, STRING, 0]);
        assert_eq!(msgs[1].text(), Some(&b""[..]));
    }

    #[test]
    fn partial_message_waits_for_more_bytes() {
        let mut decoder = MessageDecoder::new();
        assert!(decoder.push(FLOAT_BASE + 1).is_none());
        assert!(decoder.push(0).is_none());
        assert!(!decoder.is_idle());
        decoder.reset();
        assert!(decoder.is_idle());
    }

    #[test]
    fn buffer_decode_leaves_incomplete_bytes() {
        let mut buf = BytesMut::from(&[STRING, b'o', b'k', 0, INT16_BASE, 7][..]);
        let first = decode_message(&mut buf).unwrap();
        assert_eq!(first.as_str(), Some("ok"));
        assert_eq!(buf.as_ref(), &[INT16_BASE, 7]);

        assert!(decode_message(&mut buf).is_none());
        assert_eq!(buf.len(), 2);

        buf.put_u8(0);
        assert_eq!(decode_message(&mut buf).unwrap().as_i16(), Some(7));
        assert!(buf.is_empty());
    }
}
