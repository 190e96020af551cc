//! Configuration system for the orrery renderer.
//!
//! Window, render, asset and scene settings persist to disk as a RON file.
//! The scene section is the static configuration surface of the renderer:
//! uniform definitions, texture definitions and orbit definitions, keyed by
//! name. CLI flags override the file via clap.

mod cli;
mod config;
mod error;
mod platform;
mod scene;

pub use cli::CliArgs;
pub use config::{AssetConfig, Config, DebugConfig, RenderConfig, WindowConfig};
pub use error::ConfigError;
pub use platform::PlatformDirs;
pub use scene::{
    BodyConfig, BodyId, CameraConfig, OrbitDef, SceneConfig, TextureDef, UniformDef, UniformKind,
    UniformSource,
};
