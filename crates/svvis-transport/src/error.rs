use std::net::SocketAddr;

/// Errors that can occur in byte transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A blocking operation did not complete before its deadline.
    #[error("transport operation timed out")]
    Timeout,

    /// Putting into the pipe is currently disabled.
    #[error("put is disabled on this pipe")]
    PutDisabled,

    /// Non-blocking put found no free slot; the byte was dropped.
    #[error("pipe full, byte dropped")]
    Full,

    /// The backing storage could not be allocated.
    #[error("failed to allocate {capacity} bytes of pipe storage")]
    AllocationFailure { capacity: usize },

    /// A pipe must hold at least one byte.
    #[error("pipe capacity must be greater than zero")]
    ZeroCapacity,

    /// The medium is gone (peer hung up or the transport was closed).
    #[error("transport closed")]
    Closed,

    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Returns true if the error means the medium is permanently gone.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }

    /// Classify an I/O error raised by a stream read or write.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout,
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => TransportError::Closed,
            _ => TransportError::Io(err),
        }
    }

    pub(crate) fn connect(addr: SocketAddr, source: std::io::Error) -> Self {
        TransportError::Connect {
            addr: addr.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind};

    use super::*;

    #[test]
    fn socket_errors_are_classified() {
        assert!(matches!(
            TransportError::from_io(Error::from(ErrorKind::WouldBlock)),
            TransportError::Timeout
        ));
        assert!(TransportError::from_io(Error::from(ErrorKind::ConnectionReset)).is_closed());
        assert!(matches!(
            TransportError::from_io(Error::from(ErrorKind::PermissionDenied)),
            TransportError::Io(_)
        ));
    }
}
