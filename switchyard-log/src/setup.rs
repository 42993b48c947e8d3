use std::env;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::{LogConfig, LogFormat, LogLevel};

/// The full release name including the Switchyard version and SHA.
pub const RELEASE: &str = std::env!("SWITCHYARD_RELEASE");

// Import CRATE_NAMES, which lists all crates in the workspace.
include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Configures the given log level for all of Switchyard's crates.
///
/// Third-party crates never log more verbose than `INFO`, unless overridden with `RUST_LOG`.
fn get_default_filters(level: LogLevel) -> EnvFilter {
    let level = level_filter(level);
    let mut env_filter = EnvFilter::new(level.min(LevelFilter::INFO).to_string());

    // librdkafka forwards broker chatter at INFO, only keep warnings.
    if let Ok(directive) = "rdkafka=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    for name in CRATE_NAMES {
        if let Ok(directive) = format!("{name}={level}").parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    env_filter
}

/// Initialize the logging system.
///
/// Logs are written to `stderr`. If the `RUST_LOG` environment variable is set, it takes
/// precedence over the configured level.
///
/// # Example
///
/// ```
/// let log_config = switchyard_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// switchyard_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        // SAFETY: Called once during startup, before any threads are spawned.
        unsafe { env::set_var("RUST_BACKTRACE", "full") };
    }

    let subscriber = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let format = match (config.format, console::user_attended_stderr()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => {
            subscriber.compact().without_time().boxed()
        }
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            subscriber.with_ansi(false).boxed()
        }
        (LogFormat::Json, _) => subscriber
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_ansi(false)
            .boxed(),
    };

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => get_default_filters(config.level),
    };

    tracing_subscriber::registry()
        .with(format.with_filter(env_filter))
        .try_init()
        .ok();
}
