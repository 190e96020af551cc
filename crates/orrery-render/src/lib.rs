//! Program compilation, texture loading and the two rendering backends:
//! wgpu for windowed and headless GPU output, and a rayon-parallel software
//! rasterizer that runs the same shading on the CPU.

pub mod backend;
pub mod gpu;
pub mod gpu_backend;
pub mod loader;
pub mod mipmap;
pub mod program;
pub mod software;
pub mod sources;

pub use backend::{BackendError, RenderBackend};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use gpu_backend::{GpuBackend, GpuProgram, GpuTexture};
pub use loader::{LoadedTexture, TextureLoadError, TextureLocation, load_textures};
pub use program::{BindOutcome, Program, ProgramError, ShaderStage, UniformLayout};
pub use software::SoftwareBackend;
pub use sources::{ProgramSources, names};
