//! `tokio_util::codec` adapter for SvVis messages.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_message, MessageDecoder};
use crate::error::FrameError;
use crate::message::Message;

/// Codec for framing SvVis messages on async byte streams.
///
/// Wrap any `AsyncRead + AsyncWrite` in `tokio_util::codec::Framed` with
/// this codec to get a `Stream` of [`Message`]s and a `Sink` accepting them.
#[derive(Debug, Default)]
pub struct SvVisCodec {
    decoder: MessageDecoder,
}

impl SvVisCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for SvVisCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(msg) = self.decoder.push(byte) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }
}

impl Encoder<Message> for SvVisCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_message(&item, dst);
        Ok(())
    }
}

impl Encoder<&Message> for SvVisCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_message(item, dst);
        Ok(())
    }
}
