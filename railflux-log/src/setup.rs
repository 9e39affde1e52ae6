use std::env;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::{Level, LogConfig, LogFormat};

/// All crates of the workspace, as they appear in `tracing` targets.
const CRATE_NAMES: &[&str] = &[
    "railflux",
    "railflux_common",
    "railflux_config",
    "railflux_filter",
    "railflux_log",
    "railflux_normalization",
    "railflux_protocol",
];

/// Configures the given log level for all of railflux's crates.
///
/// Third-party crates are capped at `INFO`, the host application owns their verbosity.
fn default_directives(level: Level) -> String {
    let mut directives = vec![Level::Info.min(level).as_str().to_owned()];
    for name in CRATE_NAMES {
        directives.push(format!("{name}={level}"));
    }

    directives.join(",")
}

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over the configured level. If the host has already installed a
/// global subscriber, that subscriber is kept and this call has no effect.
///
/// # Example
///
/// ```
/// let log_config = railflux_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// railflux_log::init(&log_config);
/// ```
pub fn init(config: &LogConfig) {
    if config.enable_backtraces {
        env::set_var("RUST_BACKTRACE", "full");
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (config.format, console::user_attended()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => registry
            .with(fmt::layer().with_target(true).with_ansi(true).compact())
            .try_init(),
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => registry
            .with(fmt::layer().with_target(true).with_ansi(false))
            .try_init(),
        (LogFormat::Json, _) => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .try_init(),
    };

    if result.is_err() {
        crate::debug!("global subscriber already installed, keeping it");
    }
}
