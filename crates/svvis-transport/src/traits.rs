use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Byte-level medium underneath an SvVis engine.
///
/// Implemented once per physical link (serial peripheral fed by an
/// interrupt, TCP socket, in-process pipe pair). The engine drives one
/// transport from two threads at once: the receive loop only calls
/// [`pop_byte`](Transport::pop_byte), the send loop only calls the put
/// methods and [`flush`](Transport::flush). Every implementation must honour
/// the same blocking and timeout semantics so that both ends of a link
/// behave identically.
///
/// A timeout of `None` waits forever.
pub trait Transport: Send + Sync {
    /// Take one received byte, blocking until one is available.
    ///
    /// Returns [`TransportError::Timeout`](crate::TransportError::Timeout) when
    /// the deadline passes and [`TransportError::Closed`](crate::TransportError::Closed)
    /// once the medium is gone.
    fn pop_byte(&self, timeout: Option<Duration>) -> Result<u8>;

    /// Write one byte, blocking until the medium accepts it.
    fn put_byte(&self, byte: u8, timeout: Option<Duration>) -> Result<()>;

    /// Write all bytes, blocking. No partial-write reporting.
    fn put_bytes(&self, bytes: &[u8]) -> Result<()>;

    /// Block until every byte put so far has left this side of the link.
    fn flush(&self) -> Result<()>;

    /// Shut the medium down and wake every blocked call.
    ///
    /// Subsequent reads observe [`TransportError::Closed`](crate::TransportError::Closed)
    /// once buffered bytes are exhausted.
    fn close(&self) {}

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn pop_byte(&self, timeout: Option<Duration>) -> Result<u8> {
        (**self).pop_byte(timeout)
    }

    fn put_byte(&self, byte: u8, timeout: Option<Duration>) -> Result<()> {
        (**self).put_byte(byte, timeout)
    }

    fn put_bytes(&self, bytes: &[u8]) -> Result<()> {
        (**self).put_bytes(bytes)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

/// Absolute point in time derived from a relative `Option<Duration>` timeout.
///
/// Lets a multi-step blocking operation spend one caller timeout across
/// several waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    pub const FOREVER: Deadline = Deadline(None);

    /// Deadline `timeout` from now. `None` (or an unrepresentable instant) never expires.
    pub fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.and_then(|t| Instant::now().checked_add(t)))
    }

    /// Time left before expiry, `None` if the deadline never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// The absolute expiry instant, if any.
    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Returns true once the deadline has passed.
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forever_never_expires() {
        let deadline = Deadline::after(None);
        assert_eq!(deadline, Deadline::FOREVER);
        assert!(deadline.remaining().is_none());
        assert!(!deadline.expired());
    }

    #[test]
    fn zero_timeout_is_already_expired() {
        let deadline = Deadline::after(Some(Duration::ZERO));
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn remaining_shrinks() {
        let deadline = Deadline::after(Some(Duration::from_secs(60)));
        let remaining = deadline.remaining().expect("finite deadline");
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(59));
    }
}
