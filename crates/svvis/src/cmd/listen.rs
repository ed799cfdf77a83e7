use std::sync::atomic::Ordering;

use svvis_engine::{EngineConfig, EngineListener};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, print_until_done, ListenArgs, StreamEnd};
use crate::exit::{engine_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = EngineListener::bind(args.addr.as_str())
        .map_err(|err| engine_error("bind failed", err))?
        .with_engine_config(EngineConfig::default().with_name("listen"));
    info!(addr = %listener.local_addr(), "listening");

    let running = install_ctrlc_handler()?;
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let engine = listener
            .accept()
            .map_err(|err| engine_error("accept failed", err))?;
        let peer = engine.transport().peer_addr().to_string();

        // A peer that dropped before the request is simply skipped.
        if let Err(err) = engine.request_acquisition(true, None) {
            info!(peer = %peer, error = %err, "peer left before acquisition request");
            continue;
        }

        let end = print_until_done(
            &engine,
            &peer,
            args.channels.as_deref(),
            args.count,
            &mut printed,
            &running,
            format,
        )?;
        engine.shutdown();

        match end {
            StreamEnd::PeerClosed => info!(peer = %peer, "peer disconnected"),
            StreamEnd::CountReached | StreamEnd::Interrupted => break,
        }
    }

    Ok(SUCCESS)
}
