//! A vehicle streaming numeric telemetry to a host over TCP.
//!
//! The host listens, the vehicle connects, and samples flow only while the
//! host keeps acquisition on.
//!
//! Run with:
//!   cargo run -p svvis --example telemetry

use std::thread;
use std::time::Duration;

use svvis::engine::{connect, EngineError, EngineListener};

const SAMPLES: usize = 12;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = EngineListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr();
    eprintln!("host listening on {addr}");

    let vehicle = thread::spawn(move || -> Result<usize, EngineError> {
        let engine = connect(addr)?;
        let mut sent = 0usize;
        let mut tick: i16 = 0;
        loop {
            if !engine.acquisition_enabled() {
                if engine.is_closed() {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            let speed = 1.5 * f32::from(tick);
            let result = engine
                .send_i16(0, tick, Some(Duration::from_millis(100)))
                .and_then(|()| engine.send_float(0, speed, Some(Duration::from_millis(100))));
            match result {
                Ok(()) => sent += 2,
                Err(EngineError::AcquisitionOff) => continue,
                Err(EngineError::TransportClosed) => break,
                Err(err) => return Err(err),
            }
            tick = tick.wrapping_add(1);
            thread::sleep(Duration::from_millis(20));
        }
        Ok(sent)
    });

    let host = listener.accept()?;
    host.request_acquisition(true, Some(Duration::from_secs(1)))?;

    let mut received = 0usize;
    while received < SAMPLES {
        let Some(msg) = host.receive(Some(Duration::from_secs(2)))? else {
            break;
        };
        println!("{:>8} [{}] {}", msg.kind().name(), msg.channel(), msg.payload());
        received += 1;
    }

    host.request_acquisition(false, Some(Duration::from_secs(1)))?;
    host.shutdown();

    match vehicle.join() {
        Ok(result) => eprintln!("vehicle sent {} messages", result?),
        Err(_) => return Err("vehicle thread panicked".into()),
    }
    Ok(())
}
