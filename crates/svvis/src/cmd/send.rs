use std::time::Duration;

use svvis_engine::{connect_with_config, Engine, EngineConfig};
use svvis_frame::{Message, MAX_STRING_LEN};
use svvis_transport::{TcpConfig, TcpTransport};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{engine_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let msg = resolve_message(&args)?;

    let tcp_config = TcpConfig {
        connect_timeout: Some(timeout),
        ..TcpConfig::default()
    };
    // The host transmits unconditionally; acquisition gates only the peer.
    let engine_config = EngineConfig::default()
        .with_name("send")
        .with_acquisition(true);
    let engine = connect_with_config(args.addr.as_str(), &tcp_config, engine_config)
        .map_err(|err| engine_error("connect failed", err))?;

    if !args.no_acquire {
        engine
            .request_acquisition(true, Some(timeout))
            .map_err(|err| engine_error("acquisition request failed", err))?;
    }

    engine
        .send(msg, Some(timeout))
        .map_err(|err| engine_error("send failed", err))?;
    engine
        .flush(Some(timeout))
        .map_err(|err| engine_error("flush failed", err))?;

    if args.wait {
        let reply = wait_for_reply(&engine, timeout)?;
        let peer = engine.transport().peer_addr().to_string();
        print_message(&reply, &peer, format);
    }

    engine.shutdown();
    Ok(SUCCESS)
}

fn resolve_message(args: &SendArgs) -> CliResult<Message> {
    if let Some(text) = &args.string {
        validate_text(text)?;
        return Ok(Message::string(text));
    }
    let built = match (args.int16, args.float) {
        (Some(value), _) => Message::int16(args.index, value),
        (None, Some(value)) => Message::float(args.index, value),
        (None, None) => return Err(CliError::new(DATA_INVALID, "no payload given")),
    };
    built.map_err(|err| crate::exit::frame_error("invalid message", err))
}

/// Reject text the peer would misread or silently cut.
fn validate_text(text: &str) -> CliResult<()> {
    let bytes = text.as_bytes();
    if bytes.is_empty() || bytes == [1] {
        return Err(CliError::new(
            DATA_INVALID,
            "this string is reserved for acquisition control",
        ));
    }
    if bytes.contains(&0) {
        return Err(CliError::new(DATA_INVALID, "string must not contain NUL"));
    }
    if bytes.len() > MAX_STRING_LEN {
        return Err(CliError::new(
            DATA_INVALID,
            format!("string is {} bytes, max {MAX_STRING_LEN}", bytes.len()),
        ));
    }
    Ok(())
}

fn wait_for_reply(engine: &Engine<TcpTransport>, timeout: Duration) -> CliResult<Message> {
    match engine.receive(Some(timeout)) {
        Ok(Some(msg)) => Ok(msg),
        Ok(None) => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {timeout:?}"),
        )),
        Err(err) => Err(engine_error("receive failed", err)),
    }
}
