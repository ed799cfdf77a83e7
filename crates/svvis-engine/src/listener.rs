use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};

use svvis_transport::{SvVisListener, TcpConfig, TcpTransport};
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::Result;

/// Listens for SvVis peers and starts an engine per accepted connection.
pub struct EngineListener {
    listener: SvVisListener,
    engine_config: EngineConfig,
    next_peer_id: AtomicU64,
}

impl EngineListener {
    /// Bind to a socket address.
    pub fn bind<A: ToSocketAddrs + fmt::Display>(addr: A) -> Result<Self> {
        Ok(Self {
            listener: SvVisListener::bind(addr)?,
            engine_config: EngineConfig::default(),
            next_peer_id: AtomicU64::new(1),
        })
    }

    /// Override the socket options applied to accepted connections.
    pub fn with_tcp_config(mut self, config: TcpConfig) -> Self {
        self.listener = self.listener.with_config(config);
        self
    }

    /// Override the configuration of accepted engines.
    ///
    /// Each engine is named `<name>-<n>` after the configured name.
    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Accept the next connection and start its engine.
    pub fn accept(&self) -> Result<Engine<TcpTransport>> {
        let transport = self.listener.accept()?;
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{id}", self.engine_config.name);
        info!(engine = %name, peer = %transport.peer_addr(), "peer connected");
        Engine::start(transport, self.engine_config.clone().with_name(name))
    }

    /// Bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpStream;
    use std::thread;

    use super::*;

    #[test]
    fn accepts_multiple_sequential_connections() {
        let listener = EngineListener::bind("127.0.0.1:0")
            .expect("listener should bind")
            .with_engine_config(EngineConfig::default().with_name("vehicle"));
        let addr = listener.local_addr();

        let server = thread::spawn(move || {
            let first = listener.accept().expect("first accept should succeed");
            let second = listener.accept().expect("second accept should succeed");
            assert_eq!(first.name(), "vehicle-1");
            assert_eq!(second.name(), "vehicle-2");
        });

        let _c1 = TcpStream::connect(addr).expect("first client should connect");
        let _c2 = TcpStream::connect(addr).expect("second client should connect");
        server.join().expect("server thread should finish");
    }
}
