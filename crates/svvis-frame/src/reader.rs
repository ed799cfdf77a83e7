use std::time::Duration;

use svvis_transport::{Deadline, Transport, TransportError};
use tracing::trace;

use crate::codec::MessageDecoder;
use crate::error::Result;
use crate::message::Message;

/// Reads complete messages from a byte [`Transport`].
///
/// Bytes are pulled one at a time. A read that times out keeps the
/// partially decoded message, so the next call resumes where it stopped.
pub struct MessageReader<T> {
    inner: T,
    decoder: MessageDecoder,
}

impl<T: Transport> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            decoder: MessageDecoder::new(),
        }
    }

    /// Read the next complete message, waiting at most `timeout` overall.
    ///
    /// `None` waits forever. Returns a transport `Closed` error once the link
    /// is gone.
    pub fn read_message(&mut self, timeout: Option<Duration>) -> Result<Message> {
        let deadline = Deadline::after(timeout);
        loop {
            if deadline.expired() {
                return Err(TransportError::Timeout.into());
            }
            let byte = self.inner.pop_byte(deadline.remaining())?;
            if let Some(msg) = self.decoder.push(byte) {
                trace!(
                    transport = self.inner.transport_name(),
                    channel = msg.channel(),
                    len = msg.wire_len(),
                    "message decoded"
                );
                return Ok(msg);
            }
        }
    }

    /// Returns true when no message is partially received.
    pub fn is_idle(&self) -> bool {
        self.decoder.is_idle()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Read one message from a transport, blocking until it is complete.
pub fn read_message<T: Transport + ?Sized>(transport: &T) -> Result<Message> {
    let mut decoder = MessageDecoder::new();
    loop {
        let byte = transport.pop_byte(None)?;
        if let Some(msg) = decoder.push(byte) {
            return Ok(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use svvis_transport::MemoryTransport;

    use super::*;
    use crate::channel::{FLOAT_BASE, STRING};
    use crate::error::FrameError;

    #[test]
    fn reads_messages_in_order() {
        let (a, b) = MemoryTransport::pair(64).unwrap();
        a.put_bytes(&[STRING, b'o', b'k', 0, FLOAT_BASE + 2]).unwrap();
        a.put_bytes(&2.5f32.to_le_bytes()).unwrap();

        let mut reader = MessageReader::new(b);
        assert_eq!(reader.read_message(None).unwrap().as_str(), Some("ok"));
        let msg = reader.read_message(None).unwrap();
        assert_eq!(msg.channel(), FLOAT_BASE + 2);
        assert_eq!(msg.as_f32(), Some(2.5));
        assert!(reader.is_idle());
    }

    #[test]
    fn timeout_keeps_partial_message() {
        let (a, b) = MemoryTransport::pair(64).unwrap();
        let a = Arc::new(a);
        a.put_bytes(&[STRING, b'h', b'e']).unwrap();

        let mut reader = MessageReader::new(b);
        let err = reader
            .read_message(Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(!reader.is_idle());

        let writer = Arc::clone(&a);
        let feeder = thread::spawn(move || writer.put_bytes(&[b'y', 0]).unwrap());
        let msg = reader.read_message(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(msg.as_str(), Some("hey"));
        feeder.join().unwrap();
    }

    #[test]
    fn closed_link_is_reported() {
        let (a, b) = MemoryTransport::pair(8).unwrap();
        a.close();
        let mut reader = MessageReader::new(b);
        let err = reader.read_message(None).unwrap_err();
        assert!(matches!(err, FrameError::Transport(TransportError::Closed)));
    }

    #[test]
    fn one_shot_read() {
        let (a, b) = MemoryTransport::pair(8).unwrap();
        a.put_bytes(&[3]).unwrap();
        assert_eq!(read_message(&b).unwrap().channel(), 3);
    }
}
