//! A simulated vehicle answering host commands over an in-memory link.
//!
//! Run with:
//!   cargo run -p svvis --example echo-vehicle

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use svvis::engine::{Engine, EngineConfig, EngineError};
use svvis::frame::Message;
use svvis::transport::MemoryTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_end, vehicle_end) = MemoryTransport::pair(64)?;

    let vehicle = Arc::new(Engine::start(
        vehicle_end,
        EngineConfig::default().with_name("vehicle"),
    )?);
    let host = Engine::start(
        host_end,
        EngineConfig::default()
            .with_name("host")
            .with_acquisition(true)
            .with_recv_queue_capacity(16),
    )?;

    // The vehicle stays silent until the host turns acquisition on.
    let worker = {
        let vehicle = Arc::clone(&vehicle);
        thread::spawn(move || -> Result<(), EngineError> {
            loop {
                let Some(msg) = vehicle.receive(Some(Duration::from_secs(1)))? else {
                    continue;
                };
                eprintln!("vehicle got {} on channel {}", msg.payload(), msg.channel());
                match msg.as_str() {
                    Some("stop") => {
                        vehicle.send_string("stopping", None)?;
                        vehicle.flush(Some(Duration::from_secs(1)))?;
                        return Ok(());
                    }
                    Some(command) => {
                        let reply = format!("ack {command}");
                        vehicle.send(Message::string(reply), None)?;
                        vehicle.send_i16(0, command.len() as i16, None)?;
                    }
                    None => vehicle.send(msg, None)?,
                }
            }
        })
    };

    host.request_acquisition(true, Some(Duration::from_secs(1)))?;
    for command in ["fw 100", "turn 45", "stop"] {
        host.send_string(command, None)?;
        host.flush(Some(Duration::from_secs(1)))?;
    }
    host.send_float(3, 12.5, None)?;

    while let Some(msg) = host.receive(Some(Duration::from_millis(500)))? {
        println!("host got {} on channel {}", msg.payload(), msg.channel());
        if msg.as_str() == Some("stopping") {
            break;
        }
    }

    match worker.join() {
        Ok(result) => result?,
        Err(_) => return Err("vehicle thread panicked".into()),
    }
    host.shutdown();
    Ok(())
}
