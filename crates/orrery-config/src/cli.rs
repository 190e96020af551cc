//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orrery command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orrery", about = "Ray-traced sun, earth and moon")]
pub struct CliArgs {
    /// Window (or headless image) width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window (or headless image) height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory that relative texture paths resolve against.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Render without a window using the software backend.
    #[arg(long)]
    pub headless: bool,

    /// Elapsed scene time in seconds for the first headless frame.
    #[arg(long, default_value_t = 0.0)]
    pub time: f32,

    /// Number of headless frames to render.
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Frame rate used to space headless frames.
    #[arg(long)]
    pub fps: Option<f32>,

    /// Output PNG path for headless renders.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref root) = args.assets {
            self.assets.root = root.clone();
        }
        if let Some(fps) = args.fps {
            self.render.headless_fps = fps;
        }
        if let Some(ref output) = args.output {
            self.render.headless_output = output.clone();
        }
    }
}
