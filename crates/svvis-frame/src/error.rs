use svvis_transport::TransportError;

/// Errors that can occur while building, encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A numeric channel index is outside `0..max`.
    #[error("channel index {index} out of range (max {max})")]
    InvalidChannel { index: u8, max: u8 },

    /// The underlying transport failed while moving message bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred in the async codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Returns true when the link is gone and no further bytes will flow.
    pub fn is_closed(&self) -> bool {
        matches!(self, FrameError::Transport(err) if err.is_closed())
    }

    /// Returns true when a bounded wait elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameError::Transport(TransportError::Timeout))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        assert!(FrameError::from(TransportError::Closed).is_closed());
        assert!(FrameError::from(TransportError::Timeout).is_timeout());
        let err = FrameError::InvalidChannel { index: 9, max: 9 };
        assert!(!err.is_closed());
        assert_eq!(err.to_string(), "channel index 9 out of range (max 9)");
    }
}
