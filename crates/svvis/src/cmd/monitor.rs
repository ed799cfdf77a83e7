use svvis_engine::{connect_with_config, EngineConfig};
use svvis_transport::TcpConfig;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, parse_duration, print_until_done, MonitorArgs, StreamEnd};
use crate::exit::{engine_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let tcp_config = TcpConfig {
        connect_timeout: Some(timeout),
        ..TcpConfig::default()
    };
    let engine = connect_with_config(
        args.addr.as_str(),
        &tcp_config,
        EngineConfig::default().with_name("monitor"),
    )
    .map_err(|err| engine_error("connect failed", err))?;
    let peer = engine.transport().peer_addr().to_string();

    let running = install_ctrlc_handler()?;
    engine
        .request_acquisition(true, Some(timeout))
        .map_err(|err| engine_error("acquisition request failed", err))?;
    info!(peer = %peer, "monitoring");

    let mut printed = 0usize;
    let end = print_until_done(
        &engine,
        &peer,
        args.channels.as_deref(),
        args.count,
        &mut printed,
        &running,
        format,
    )?;

    if end != StreamEnd::PeerClosed {
        // Leave the peer quiet for the next client.
        if let Err(err) = engine.request_acquisition(false, Some(timeout)) {
            warn!(error = %err, "failed to stop peer acquisition");
        }
    }
    info!(peer = %peer, printed, ?end, "monitor finished");
    engine.shutdown();
    Ok(SUCCESS)
}
