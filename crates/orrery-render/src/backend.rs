//! The seam between the frame driver and a concrete renderer.

use std::borrow::BorrowMut;

use orrery_scene::UniformValue;
use orrery_shading::TextureImage;

use crate::gpu::SurfaceError;
use crate::program::{BindOutcome, Program, ProgramError};
use crate::sources::ProgramSources;

/// Errors a backend can report while uploading or drawing.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The presentation surface could not provide a frame.
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// The image exceeds what the device can hold.
    #[error("texture '{name}' is {width}x{height}, above the device limit of {limit}")]
    TextureTooLarge {
        name: String,
        width: u32,
        height: u32,
        limit: u32,
    },

    /// Copying the rendered frame back to the CPU failed.
    #[error("frame readback failed: {0}")]
    Readback(String),
}

/// A renderer that can run one full-screen fragment program.
///
/// Programs are compiled once; uniforms are bound by name on the program and
/// textures are bound to numbered units that sampler uniforms refer to.
pub trait RenderBackend {
    /// Compiled program plus whatever backend objects it needs.
    type Program: BorrowMut<Program>;
    /// An uploaded texture.
    type Texture;

    fn compile_program(&mut self, sources: &ProgramSources) -> Result<Self::Program, ProgramError>;

    /// Set a uniform on `program`. Unknown names and kind mismatches are
    /// logged and otherwise ignored.
    fn bind_uniform(&mut self, program: &mut Self::Program, name: &str, value: UniformValue) -> BindOutcome {
        program.borrow_mut().bind(name, value)
    }

    fn upload_texture(&mut self, name: &str, image: &TextureImage) -> Result<Self::Texture, BackendError>;

    /// Make `texture` the texture sampled through `unit`.
    fn bind_texture(&mut self, unit: u32, texture: &Self::Texture);

    /// Current drawing buffer size in pixels.
    fn resolution(&self) -> (u32, u32);

    /// Resize the drawing buffer. Zero dimensions are clamped to 1.
    fn resize(&mut self, width: u32, height: u32);

    /// Draw the full-screen quad with `program`.
    fn draw_full_screen_quad(&mut self, program: &mut Self::Program) -> Result<(), BackendError>;

    /// Clear to black without running any program.
    fn draw_blank(&mut self) -> Result<(), BackendError>;
}
