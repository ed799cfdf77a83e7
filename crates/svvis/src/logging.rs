use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, prelude::*};

/// Crates whose events follow `--log-level`. Anything else is capped at warn.
const SVVIS_TARGETS: [&str; 4] = ["svvis", "svvis_transport", "svvis_frame", "svvis_engine"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn link_targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    SVVIS_TARGETS.iter().fold(
        Targets::new().with_default(level.min(LevelFilter::WARN)),
        |targets, target| targets.with_target(*target, level),
    )
}

/// Install the stderr subscriber.
///
/// Engine worker threads are named `<engine>-send` / `<engine>-recv` and
/// every library event carries an `engine` field, so thread names are kept
/// next to the span of the running command.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = link_targets(level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_ansi(false)
        .with_target(false);

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json().with_current_span(true))
            .try_init(),
    };
    // A subscriber installed earlier (tests) stays in place.
    let _ = result;
}
