use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Result;
use crate::pipe::RingPipe;
use crate::traits::Transport;

/// One end of an in-process duplex link built from two ring pipes.
///
/// Bytes put on one end are popped from the other. [`flush`](Transport::flush)
/// blocks until the peer has consumed everything written so far. Closing
/// either end closes both directions.
#[derive(Debug)]
pub struct MemoryTransport {
    rx: Arc<RingPipe>,
    tx: Arc<RingPipe>,
    write: Mutex<()>,
}

impl MemoryTransport {
    /// Create two connected ends, each direction buffering `capacity` bytes.
    pub fn pair(capacity: usize) -> Result<(MemoryTransport, MemoryTransport)> {
        let a_to_b = Arc::new(RingPipe::with_capacity(capacity)?);
        let b_to_a = Arc::new(RingPipe::with_capacity(capacity)?);

        let a = MemoryTransport {
            rx: Arc::clone(&b_to_a),
            tx: Arc::clone(&a_to_b),
            write: Mutex::new(()),
        };
        let b = MemoryTransport {
            rx: a_to_b,
            tx: b_to_a,
            write: Mutex::new(()),
        };
        Ok((a, b))
    }

    /// Bytes written by this end that the peer has not consumed yet.
    pub fn unread(&self) -> usize {
        self.tx.len()
    }
}

impl Transport for MemoryTransport {
    fn pop_byte(&self, timeout: Option<Duration>) -> Result<u8> {
        self.rx.pop(timeout)
    }

    fn put_byte(&self, byte: u8, timeout: Option<Duration>) -> Result<()> {
        let _write = self.write.lock();
        self.tx.put(byte, timeout)
    }

    fn put_bytes(&self, bytes: &[u8]) -> Result<()> {
        let _write = self.write.lock();
        for &byte in bytes {
            self.tx.put(byte, None)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.tx.wait_empty(None)
    }

    fn close(&self) {
        self.rx.close();
        self.tx.close();
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}
