use bytes::BytesMut;
use svvis_transport::Transport;
use tracing::trace;

use crate::channel::MAX_PAYLOAD;
use crate::error::Result;
use crate::message::Message;

/// Write one message: the channel byte, then the whole payload.
///
/// Both steps wait forever for the transport. Callers that share a
/// transport between writers must serialize calls themselves so the bytes
/// of two messages never interleave.
pub fn write_message<T: Transport + ?Sized>(transport: &T, msg: &Message) -> Result<()> {
    let mut payload = BytesMut::with_capacity(MAX_PAYLOAD);
    msg.put_payload(&mut payload);
    put_message(transport, msg.channel(), &payload)
}

fn put_message<T: Transport + ?Sized>(transport: &T, channel: u8, payload: &[u8]) -> Result<()> {
    transport.put_byte(channel, None)?;
    if !payload.is_empty() {
        transport.put_bytes(payload)?;
    }
    trace!(
        transport = transport.transport_name(),
        channel,
        len = payload.len(),
        "message written"
    );
    Ok(())
}

/// Writes complete messages to a [`Transport`], reusing one encode buffer.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Transport> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_PAYLOAD),
        }
    }

    /// Write a complete message (blocking).
    pub fn write_message(&mut self, msg: &Message) -> Result<()> {
        self.buf.clear();
        msg.put_payload(&mut self.buf);
        put_message(&self.inner, msg.channel(), &self.buf)
    }

    /// Flush the underlying transport.
    pub fn flush(&self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
