use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use svvis_engine::{Engine, EngineError};
use svvis_transport::Transport;

use crate::exit::{engine_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::{print_message, OutputFormat};

pub mod echo;
pub mod listen;
pub mod monitor;
pub mod send;
pub mod version;

/// How often blocking receives wake up to check for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a peer and send one message.
    Send(SendArgs),
    /// Connect to a peer, enable its acquisition and print what it sends.
    Monitor(MonitorArgs),
    /// Accept peers one at a time and print what they send.
    Listen(ListenArgs),
    /// Accept peers one at a time and echo every message back.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Send(_) => "send",
            Command::Monitor(_) => "monitor",
            Command::Listen(_) => "listen",
            Command::Echo(_) => "echo",
            Command::Version(_) => "version",
        }
    }
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["string", "int16", "float"])))]
pub struct SendArgs {
    /// Peer address (host:port).
    pub addr: String,
    /// String payload (at most 31 bytes).
    #[arg(long, short = 's')]
    pub string: Option<String>,
    /// 16-bit integer payload for numeric channel --index.
    #[arg(long, allow_hyphen_values = true)]
    pub int16: Option<i16>,
    /// Float payload for numeric channel --index.
    #[arg(long, allow_hyphen_values = true)]
    pub float: Option<f32>,
    /// Numeric channel index (0-8).
    #[arg(long, short = 'i', default_value = "0")]
    pub index: u8,
    /// Do not ask the peer to enable acquisition first.
    #[arg(long)]
    pub no_acquire: bool,
    /// Wait for one message from the peer and print it.
    #[arg(long)]
    pub wait: bool,
    /// Timeout for connecting, flushing and --wait (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", env = "SVVIS_TIMEOUT")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Peer address (host:port).
    pub addr: String,
    /// Only print these channel numbers (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<u8>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", env = "SVVIS_TIMEOUT")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (host:port).
    pub addr: String,
    /// Only print these channel numbers (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<u8>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind (host:port).
    pub addr: String,
    /// Only echo these channel numbers (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<u8>>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Why a print loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    CountReached,
    PeerClosed,
    Interrupted,
}

/// Print received messages until the count is reached, the peer goes away or
/// Ctrl-C is pressed.
pub fn print_until_done<T: Transport + 'static>(
    engine: &Engine<T>,
    peer: &str,
    channels: Option<&[u8]>,
    count: Option<usize>,
    printed: &mut usize,
    running: &AtomicBool,
    format: OutputFormat,
) -> CliResult<StreamEnd> {
    if count.is_some_and(|count| *printed >= count) {
        return Ok(StreamEnd::CountReached);
    }
    while running.load(Ordering::SeqCst) {
        let msg = match engine.receive(Some(POLL_INTERVAL)) {
            Ok(Some(msg)) => msg,
            Ok(None) => continue,
            Err(EngineError::TransportClosed) => return Ok(StreamEnd::PeerClosed),
            Err(err) => return Err(engine_error("receive failed", err)),
        };

        if !channel_selected(channels, msg.channel()) {
            continue;
        }

        print_message(&msg, peer, format);
        *printed = printed.saturating_add(1);

        if count.is_some_and(|count| *printed >= count) {
            return Ok(StreamEnd::CountReached);
        }
    }
    Ok(StreamEnd::Interrupted)
}

pub fn channel_selected(channels: Option<&[u8]>, channel: u8) -> bool {
    channels.is_none_or(|channels| channels.contains(&channel))
}

pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
