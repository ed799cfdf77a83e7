use std::fmt;
use std::net::ToSocketAddrs;

use svvis_transport::{TcpConfig, TcpTransport};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::Result;

/// Connect to a listening SvVis endpoint and start an engine on the link.
pub fn connect<A: ToSocketAddrs + fmt::Display>(addr: A) -> Result<Engine<TcpTransport>> {
    connect_with_config(addr, &TcpConfig::default(), EngineConfig::default())
}

/// Connect with explicit socket and engine configuration.
pub fn connect_with_config<A: ToSocketAddrs + fmt::Display>(
    addr: A,
    tcp_config: &TcpConfig,
    engine_config: EngineConfig,
) -> Result<Engine<TcpTransport>> {
    let transport = TcpTransport::connect_with_config(addr, tcp_config)?;
    Engine::start(transport, engine_config)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::error::EngineError;
    use crate::listener::EngineListener;

    #[test]
    fn connect_convenience() {
        let listener = EngineListener::bind("127.0.0.1:0").expect("listener should bind");
        let addr = listener.local_addr();

        let server = thread::spawn(move || {
            let engine = listener.accept().expect("listener should accept");
            engine
                .request_acquisition(true, None)
                .expect("control write should succeed");
            let msg = engine
                .receive(Some(Duration::from_secs(5)))
                .expect("receive should succeed")
                .expect("message should arrive");
            assert_eq!(msg.as_str(), Some("hello"));
        });

        let client = connect(addr).expect("client should connect");
        let start = std::time::Instant::now();
        while !client.acquisition_enabled() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        client
            .send_string("hello", Some(Duration::from_secs(5)))
            .expect("send should queue");
        client
            .flush(Some(Duration::from_secs(5)))
            .expect("flush should drain");
        server.join().expect("server thread should finish");
    }

    #[test]
    fn connect_refused_is_transport_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = connect(addr).unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
