use std::fmt;
use std::io;

use svvis_engine::EngineError;
use svvis_frame::FrameError;
use svvis_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
/// Peer has not enabled acquisition (EX_TEMPFAIL).
pub const ACQUISITION_OFF: i32 = 75;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidChannel { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn engine_error(context: &str, err: EngineError) -> CliError {
    match err {
        EngineError::Transport(err) => transport_error(context, err),
        EngineError::Frame(err) => frame_error(context, err),
        EngineError::Timeout(_) | EngineError::QueueFull { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        EngineError::AcquisitionOff => CliError::new(ACQUISITION_OFF, format!("{context}: {err}")),
        EngineError::TransportClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        EngineError::InvalidChannel { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn engine_errors_map_to_exit_codes() {
        let cases = [
            (EngineError::Timeout(Duration::from_secs(1)), TIMEOUT),
            (EngineError::QueueFull { capacity: 4 }, TIMEOUT),
            (EngineError::AcquisitionOff, ACQUISITION_OFF),
            (EngineError::TransportClosed, TRANSPORT_ERROR),
            (EngineError::InvalidChannel { index: 9 }, USAGE),
            (EngineError::InvalidConfig("zero"), INTERNAL),
        ];
        for (err, code) in cases {
            assert_eq!(engine_error("op", err).code, code);
        }
    }

    #[test]
    fn connect_refused_is_transport_error() {
        let err = TransportError::Connect {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        let cli = engine_error("connect failed", EngineError::Transport(err));
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: "));
    }
}
