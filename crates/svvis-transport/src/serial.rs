use std::io::{ErrorKind, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::pipe::RingPipe;
use crate::traits::Transport;

/// Default receive pipe size of a serial endpoint, in bytes.
pub const DEFAULT_RX_CAPACITY: usize = 64;

/// Serial-peripheral endpoint: an interrupt-fed receive pipe plus a byte sink.
///
/// The receive side is a [`RingPipe`] filled by a [`PipeFeeder`] from the
/// peripheral's receive interrupt (or whatever stands in for it). The
/// transmit side is any blocking [`Write`] sink, typically a wrapper around
/// the peripheral's data register.
pub struct SerialTransport<W> {
    rx: Arc<RingPipe>,
    tx: Mutex<W>,
}

/// Producer handle for the receive pipe of a [`SerialTransport`].
///
/// Never blocks, so it can be driven from interrupt context. Bytes arriving
/// while the pipe is full are dropped and counted.
#[derive(Clone, Debug)]
pub struct PipeFeeder {
    pipe: Arc<RingPipe>,
}

impl PipeFeeder {
    /// Deliver one received byte. Returns false if the byte was dropped.
    pub fn on_receive(&self, byte: u8) -> bool {
        match self.pipe.try_put(byte) {
            Ok(()) => true,
            Err(err) => {
                trace!(byte, error = %err, "serial byte dropped");
                false
            }
        }
    }

    /// Bytes dropped so far because the receive pipe was full.
    pub fn dropped(&self) -> u64 {
        self.pipe.dropped()
    }
}

impl<W: Write + Send> SerialTransport<W> {
    /// Create a serial endpoint with the default receive pipe size.
    pub fn new(tx: W) -> Result<Self> {
        Self::with_rx_capacity(tx, DEFAULT_RX_CAPACITY)
    }

    /// Create a serial endpoint with an explicit receive pipe size.
    pub fn with_rx_capacity(tx: W, rx_capacity: usize) -> Result<Self> {
        Ok(Self {
            rx: Arc::new(RingPipe::with_capacity(rx_capacity)?),
            tx: Mutex::new(tx),
        })
    }

    /// Handle for the receive interrupt.
    pub fn feeder(&self) -> PipeFeeder {
        PipeFeeder {
            pipe: Arc::clone(&self.rx),
        }
    }

    /// Enable or disable reception. Buffered bytes stay readable.
    pub fn enable_receive(&self, enabled: bool) {
        self.rx.enable_put(enabled);
    }

    /// The receive pipe.
    pub fn rx_pipe(&self) -> &RingPipe {
        &self.rx
    }

    /// Consume the endpoint and return the transmit sink.
    pub fn into_sink(self) -> W {
        self.tx.into_inner()
    }

    fn lock_tx(&self, timeout: Option<Duration>) -> Result<MutexGuard<'_, W>> {
        match timeout {
            None => Ok(self.tx.lock()),
            Some(timeout) => self.tx.try_lock_for(timeout).ok_or(TransportError::Timeout),
        }
    }
}

impl<W: Write + Send> Transport for SerialTransport<W> {
    fn pop_byte(&self, timeout: Option<Duration>) -> Result<u8> {
        self.rx.pop(timeout)
    }

    fn put_byte(&self, byte: u8, timeout: Option<Duration>) -> Result<()> {
        let mut tx = self.lock_tx(timeout)?;
        write_all(&mut *tx, &[byte])
    }

    fn put_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut tx = self.lock_tx(None)?;
        write_all(&mut *tx, bytes)
    }

    fn flush(&self) -> Result<()> {
        let mut tx = self.lock_tx(None)?;
        loop {
            match tx.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }

    fn close(&self) {
        self.rx.close();
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

fn write_all<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match sink.write(&bytes[offset..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::from_io(err)),
        }
    }
    Ok(())
}

impl<W> std::fmt::Debug for SerialTransport<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("rx", &self.rx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn fed_bytes_are_popped_in_order() {
        let serial = SerialTransport::new(Vec::new()).unwrap();
        let feeder = serial.feeder();

        assert!(feeder.on_receive(0x0B));
        assert!(feeder.on_receive(0xEF));
        assert!(feeder.on_receive(0xFF));

        assert_eq!(serial.pop_byte(None).unwrap(), 0x0B);
        assert_eq!(serial.pop_byte(None).unwrap(), 0xEF);
        assert_eq!(serial.pop_byte(None).unwrap(), 0xFF);
        assert!(matches!(
            serial.pop_byte(Some(Duration::from_millis(5))),
            Err(TransportError::Timeout)
        ));
    }

    #[test]
    fn feeder_overflow_is_counted_not_blocking() {
        let serial = SerialTransport::with_rx_capacity(Vec::new(), 2).unwrap();
        let feeder = serial.feeder();

        assert!(feeder.on_receive(1));
        assert!(feeder.on_receive(2));
        assert!(!feeder.on_receive(3));
        assert_eq!(feeder.dropped(), 1);
        assert_eq!(serial.rx_pipe().len(), 2);
    }

    #[test]
    fn disabled_receive_drops_incoming_bytes() {
        let serial = SerialTransport::new(Vec::new()).unwrap();
        let feeder = serial.feeder();
        feeder.on_receive(1);
        serial.enable_receive(false);
        assert!(!feeder.on_receive(2));
        assert_eq!(serial.pop_byte(None).unwrap(), 1);
    }

    #[test]
    fn writes_reach_the_sink() {
        let serial = SerialTransport::new(Vec::new()).unwrap();
        serial.put_byte(21, None).unwrap();
        serial.put_bytes(&1.5f32.to_le_bytes()).unwrap();
        serial.flush().unwrap();

        let sink = serial.into_sink();
        let mut expected = vec![21u8];
        expected.extend_from_slice(&1.5f32.to_le_bytes());
        assert_eq!(sink, expected);
    }

    #[test]
    fn interrupt_thread_feeds_consumer() {
        let serial = SerialTransport::with_rx_capacity(Vec::new(), 4).unwrap();
        let feeder = serial.feeder();

        let isr = thread::spawn(move || {
            for byte in 0..32u8 {
                while !feeder.on_receive(byte) {
                    thread::yield_now();
                }
            }
        });

        for expected in 0..32u8 {
            assert_eq!(
                serial.pop_byte(Some(Duration::from_secs(5))).unwrap(),
                expected
            );
        }
        isr.join().unwrap();
    }

    #[test]
    fn close_ends_reception() {
        let serial = SerialTransport::new(Vec::new()).unwrap();
        serial.close();
        assert!(matches!(serial.pop_byte(None), Err(TransportError::Closed)));
        assert_eq!(serial.transport_name(), "serial");
    }
}
