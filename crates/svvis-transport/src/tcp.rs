use std::fmt;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Smallest timeout handed to the socket; the OS rejects a zero timeout.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for TCP transports.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Timeout for establishing an outgoing connection. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm. SvVis messages are a handful of bytes each.
    pub nodelay: bool,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            nodelay: true,
        }
    }
}

/// Host-side SvVis endpoint over a TCP socket.
///
/// Reads and writes use independent handles of the same socket so the
/// receive loop can block in [`pop_byte`](Transport::pop_byte) while the send
/// loop writes.
pub struct TcpTransport {
    reader: Mutex<SocketReader>,
    writer: Mutex<SocketWriter>,
    control: TcpStream,
    peer_addr: SocketAddr,
}

struct SocketReader {
    stream: BufReader<TcpStream>,
    timeout: Option<Duration>,
}

struct SocketWriter {
    stream: TcpStream,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to a listening SvVis endpoint (blocking).
    pub fn connect<A: ToSocketAddrs + fmt::Display>(addr: A) -> Result<Self> {
        Self::connect_with_config(addr, &TcpConfig::default())
    }

    /// Connect with explicit configuration.
    pub fn connect_with_config<A: ToSocketAddrs + fmt::Display>(
        addr: A,
        config: &TcpConfig,
    ) -> Result<Self> {
        let display = addr.to_string();
        let candidates = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: display.clone(),
                source,
            })?;

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    debug!(addr = %candidate, "connected to svvis endpoint");
                    return Self::from_stream_with_config(stream, config);
                }
                Err(err) => last_err = Some(TransportError::connect(candidate, err)),
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Connect {
            addr: display,
            source: std::io::Error::new(ErrorKind::InvalidInput, "address resolved to nothing"),
        }))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        Self::from_stream_with_config(stream, &TcpConfig::default())
    }

    /// Wrap an already connected stream with explicit configuration.
    pub fn from_stream_with_config(stream: TcpStream, config: &TcpConfig) -> Result<Self> {
        stream.set_nodelay(config.nodelay)?;
        let peer_addr = stream.peer_addr()?;
        let read_half = stream.try_clone()?;
        let control = stream.try_clone()?;

        Ok(Self {
            reader: Mutex::new(SocketReader {
                stream: BufReader::new(read_half),
                timeout: None,
            }),
            writer: Mutex::new(SocketWriter {
                stream,
                timeout: None,
            }),
            control,
            peer_addr,
        })
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Transport for TcpTransport {
    fn pop_byte(&self, timeout: Option<Duration>) -> Result<u8> {
        let mut reader = self.reader.lock();
        if reader.stream.buffer().is_empty() {
            let timeout = timeout.map(|t| t.max(MIN_SOCKET_TIMEOUT));
            if reader.timeout != timeout {
                reader.stream.get_ref().set_read_timeout(timeout)?;
                reader.timeout = timeout;
            }
        }

        let mut byte = [0u8; 1];
        loop {
            match reader.stream.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
    }

    fn put_byte(&self, byte: u8, timeout: Option<Duration>) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(&[byte], timeout)
    }

    fn put_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(bytes, None)
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer
            .stream
            .flush()
            .map_err(TransportError::from_io)
    }

    fn close(&self) {
        match self.control.shutdown(Shutdown::Both) {
            Ok(()) => debug!(peer = %self.peer_addr, "tcp transport shut down"),
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => debug!(peer = %self.peer_addr, error = %err, "tcp shutdown failed"),
        }
    }

    fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

impl SocketWriter {
    fn write_all(&mut self, bytes: &[u8], timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.map(|t| t.max(MIN_SOCKET_TIMEOUT));
        if self.timeout != timeout {
            self.stream.set_write_timeout(timeout)?;
            self.timeout = timeout;
        }

        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.stream.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(err)),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

/// Accepts SvVis TCP connections.
pub struct SvVisListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: TcpConfig,
}

impl SvVisListener {
    /// Bind and listen on a TCP address.
    pub fn bind<A: ToSocketAddrs + fmt::Display>(addr: A) -> Result<Self> {
        let display = addr.to_string();
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            addr: display.clone(),
            source,
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: display,
                source,
            })?;

        info!(addr = %local_addr, "listening for svvis connections");

        Ok(Self {
            listener,
            local_addr,
            config: TcpConfig::default(),
        })
    }

    /// Override the configuration applied to accepted connections.
    pub fn with_config(mut self, config: TcpConfig) -> Self {
        self.config = config;
        self
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<TcpTransport> {
        let (stream, addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(peer = %addr, "accepted connection");
        TcpTransport::from_stream_with_config(stream, &self.config)
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
