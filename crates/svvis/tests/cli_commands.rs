#![cfg(feature = "cli")]

use std::net::TcpListener;
use std::process::Command;
use std::thread;
use std::time::Duration;

use svvis::engine::{Engine, EngineConfig};
use svvis::frame::Message;
use svvis::transport::TcpTransport;

/// Accept one CLI connection and return the first message it delivers.
fn spawn_peer() -> (String, thread::JoinHandle<Option<Message>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener
        .local_addr()
        .expect("listener should have an address")
        .to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("peer should accept");
        let transport = TcpTransport::from_stream(stream).expect("stream should wrap");
        let engine = Engine::start(transport, EngineConfig::default().with_name("peer"))
            .expect("peer engine should start");
        engine
            .receive(Some(Duration::from_secs(5)))
            .expect("peer receive should succeed")
    });

    (addr, handle)
}

#[test]
fn send_string_reaches_peer() {
    let (addr, peer) = spawn_peer();

    let output = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .arg("--log-level")
        .arg("error")
        .arg("send")
        .arg(&addr)
        .arg("--string")
        .arg("help")
        .output()
        .expect("send should run");

    assert!(
        output.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let msg = peer
        .join()
        .expect("peer thread should finish")
        .expect("peer should receive a message");
    assert_eq!(msg.as_str(), Some("help"));
}

#[test]
fn send_int16_arrives_on_indexed_channel() {
    let (addr, peer) = spawn_peer();

    let status = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .args(["--log-level", "error", "send", &addr, "--int16", "-17", "--index", "2"])
        .status()
        .expect("send should run");

    assert!(status.success());
    let msg = peer
        .join()
        .expect("peer thread should finish")
        .expect("peer should receive a message");
    assert_eq!(msg.channel(), 13);
    assert_eq!(msg.as_i16(), Some(-17));
}

#[test]
fn send_out_of_range_index_exits_64() {
    let status = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .args(["--log-level", "error", "send", "127.0.0.1:9", "--float", "1.5", "--index", "9"])
        .status()
        .expect("send should run");

    assert_eq!(status.code(), Some(64));
}

#[test]
fn send_reserved_string_exits_60() {
    let status = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .args(["--log-level", "error", "send", "127.0.0.1:9", "--string", "\u{1}"])
        .status()
        .expect("send should run");

    assert_eq!(status.code(), Some(60));
}

#[test]
fn send_to_closed_port_is_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        listener
            .local_addr()
            .expect("listener should have an address")
            .to_string()
    };

    let status = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .args(["--log-level", "error", "send", &addr, "--string", "hi", "--timeout", "1s"])
        .status()
        .expect("send should run");

    assert_eq!(status.code(), Some(3));
}

#[test]
fn version_extended_reports_protocol() {
    let output = Command::new(env!("CARGO_BIN_EXE_svvis"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: svvis"));
    assert!(stdout.contains("max_payload=32"));
}
