use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use svvis_engine::{Engine, EngineConfig, EngineError, EngineListener};
use svvis_transport::Transport;
use tracing::{info, warn};

use crate::cmd::{channel_selected, install_ctrlc_handler, EchoArgs, POLL_INTERVAL};
use crate::exit::{engine_error, CliError, CliResult, SUCCESS};
use crate::output::OutputFormat;

const ECHO_SEND_TIMEOUT: Duration = Duration::from_secs(5);

enum RecvErrorDisposition {
    Break,
    Fatal(CliError),
}

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let listener = EngineListener::bind(args.addr.as_str())
        .map_err(|err| engine_error("bind failed", err))?
        .with_engine_config(
            EngineConfig::default()
                .with_name("echo")
                .with_acquisition(true),
        );
    info!(addr = %listener.local_addr(), "echo server listening");

    let running = install_ctrlc_handler()?;

    while running.load(Ordering::SeqCst) {
        let engine = listener
            .accept()
            .map_err(|err| engine_error("accept failed", err))?;
        echo_peer(&engine, args.channels.as_deref(), &running)?;
        engine.shutdown();
    }

    Ok(SUCCESS)
}

fn echo_peer<T: Transport + 'static>(
    engine: &Engine<T>,
    channels: Option<&[u8]>,
    running: &AtomicBool,
) -> CliResult<()> {
    while running.load(Ordering::SeqCst) {
        let msg = match engine.receive(Some(POLL_INTERVAL)) {
            Ok(Some(msg)) => msg,
            Ok(None) => continue,
            Err(err) => match classify_recv_error(err) {
                RecvErrorDisposition::Break => break,
                RecvErrorDisposition::Fatal(cli_err) => return Err(cli_err),
            },
        };

        if !channel_selected(channels, msg.channel()) {
            continue;
        }

        info!(
            channel = msg.channel(),
            kind = msg.kind().name(),
            len = msg.wire_len(),
            "echoing message"
        );

        match engine.send(msg, Some(ECHO_SEND_TIMEOUT)) {
            Ok(()) => {}
            Err(EngineError::TransportClosed) => break,
            Err(EngineError::AcquisitionOff) => {
                warn!("peer turned acquisition off; message not echoed");
            }
            Err(err) => return Err(engine_error("echo send failed", err)),
        }
    }
    Ok(())
}

fn classify_recv_error(err: EngineError) -> RecvErrorDisposition {
    if matches!(err, EngineError::TransportClosed) {
        return RecvErrorDisposition::Break;
    }
    RecvErrorDisposition::Fatal(engine_error("receive failed", err))
}
