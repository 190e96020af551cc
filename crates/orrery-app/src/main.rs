//! The `orrery` binary: a window by default, PNG output with `--headless`.

use std::process::ExitCode;

use clap::Parser;
use orrery_app::{HeadlessRequest, render_headless};
use orrery_config::{CliArgs, Config, PlatformDirs};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match (&args.config, PlatformDirs::resolve()) {
        (Some(dir), _) => PlatformDirs {
            config_dir: dir.clone(),
            log_dir: dir.join("logs"),
        },
        (None, Ok(dirs)) => dirs,
        (None, Err(e)) => {
            eprintln!("Failed to resolve platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    orrery_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    if args.headless {
        let request = HeadlessRequest::from_cli(&config, &args);
        return match render_headless(&config, &request) {
            Ok(paths) => {
                info!("Wrote {} frame(s)", paths.len());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Headless render failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match orrery_app::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
