//! Windowless rendering to PNG with the software backend.

use std::path::{Path, PathBuf};

use orrery_config::{CliArgs, Config};
use orrery_render::{BackendError, ProgramSources, SoftwareBackend};
use tracing::{info, instrument};

use crate::driver::{SolarSystem, StartupError};

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("frame rate must be positive, got {0}")]
    InvalidFps(f32),

    #[error("at least one frame must be rendered")]
    NoFrames,
}

/// What to render and where to put it.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessRequest {
    pub width: u32,
    pub height: u32,
    /// Scene time of the first frame, in seconds.
    pub start_time: f32,
    pub frames: u32,
    pub fps: f32,
    pub output: PathBuf,
}

impl HeadlessRequest {
    /// Size, rate and output from the (already overridden) config, timing
    /// from the command line.
    pub fn from_cli(config: &Config, args: &CliArgs) -> Self {
        Self {
            width: config.window.width,
            height: config.window.height,
            start_time: args.time,
            frames: args.frames,
            fps: config.render.headless_fps,
            output: config.render.headless_output.clone(),
        }
    }

    /// Scene time of every frame.
    pub fn frame_times(&self) -> Vec<f32> {
        (0..self.frames)
            .map(|i| self.start_time + i as f32 / self.fps)
            .collect()
    }

    /// Output path of frame `index`. A single frame goes to the output path
    /// itself; sequences get a zero-padded index before the extension.
    pub fn frame_path(&self, index: u32) -> PathBuf {
        if self.frames <= 1 {
            return self.output.clone();
        }
        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let extension = self
            .output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".to_string());
        self.output
            .with_file_name(format!("{stem}_{index:04}.{extension}"))
    }
}

/// Render every requested frame and return the written paths.
#[instrument(skip_all, fields(frames = request.frames, width = request.width, height = request.height))]
pub fn render_headless(
    config: &Config,
    request: &HeadlessRequest,
) -> Result<Vec<PathBuf>, HeadlessError> {
    if request.frames == 0 {
        return Err(HeadlessError::NoFrames);
    }
    if request.fps.is_nan() || request.fps <= 0.0 {
        return Err(HeadlessError::InvalidFps(request.fps));
    }

    let backend = SoftwareBackend::new(request.width, request.height);
    let mut system = SolarSystem::start(
        backend,
        &config.scene,
        &config.assets.root,
        &ProgramSources::default(),
    )?;

    let mut written = Vec::with_capacity(request.frames as usize);
    for (index, time) in request.frame_times().into_iter().enumerate() {
        system.frame(time)?;
        let path = request.frame_path(index as u32);
        write_png(system.backend().framebuffer(), &path)?;
        info!("Rendered t={time:.3}s to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn write_png(image: &image::RgbaImage, path: &Path) -> Result<(), HeadlessError> {
    image.save(path).map_err(|source| HeadlessError::Write {
        path: path.to_path_buf(),
        source,
    })
}
