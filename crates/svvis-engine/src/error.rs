use std::time::Duration;

use svvis_frame::FrameError;
use svvis_transport::TransportError;

/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A bounded wait elapsed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The peer has not enabled acquisition; nothing may be queued.
    #[error("acquisition is off")]
    AcquisitionOff,

    /// The outbound queue stayed full for the whole timeout.
    #[error("send queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The link is gone; the engine accepts no more work.
    #[error("transport closed")]
    TransportClosed,

    /// A numeric channel index is outside the channel block.
    #[error("invalid channel index {index}")]
    InvalidChannel { index: u8 },

    /// The engine configuration cannot be used.
    #[error("invalid engine config: {0}")]
    InvalidConfig(&'static str),

    /// A worker thread could not be spawned.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl EngineError {
    /// Map a transport failure, folding a vanished link into [`EngineError::TransportClosed`].
    pub(crate) fn link(err: TransportError) -> Self {
        if err.is_closed() {
            EngineError::TransportClosed
        } else {
            EngineError::Transport(err)
        }
    }

    /// Map a frame failure, keeping channel and closed-link cases distinct.
    pub(crate) fn frame(err: FrameError) -> Self {
        match err {
            FrameError::InvalidChannel { index, .. } => EngineError::InvalidChannel { index },
            FrameError::Transport(err) => EngineError::link(err),
            other => EngineError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
