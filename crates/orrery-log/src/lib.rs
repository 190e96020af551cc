//! Structured logging for the orrery renderer.
//!
//! Library crates log through the `log` facade; the application logs through
//! `tracing`. This crate installs one `tracing-subscriber` registry that
//! receives both, with console output and, in debug builds, a JSON log file.

use orrery_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "orrery.log";

/// Initialize the global tracing subscriber.
///
/// * `log_dir` - directory for the JSON log file (debug builds only)
/// * `debug_build` - whether file logging may be enabled
/// * `config` - optional configuration whose `debug.log_level` seeds the filter
///
/// `RUST_LOG` always wins over the config.
///
/// ```no_run
/// use orrery_log::init_logging;
///
/// init_logging(None, false, None);
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_string(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let file_logging = config.is_none_or(|c| c.debug.log_to_file);
    if debug_build
        && file_logging
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// The filter directive derived from the config, falling back to
/// [`DEFAULT_FILTER`]. A bare level keeps the wgpu/naga noise suppression.
pub fn filter_string(config: Option<&Config>) -> String {
    match config.map(|c| c.debug.log_level.trim()) {
        Some(level) if !level.is_empty() => {
            if level.contains('=') || level.contains(',') {
                level.to_string()
            } else {
                format!("{level},wgpu=warn,naga=warn")
            }
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// An `EnvFilter` with the default directives.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
