//! CPU rendition of the orrery fragment program.
//!
//! Every function here mirrors the WGSL program shipped by `orrery-render`
//! operation for operation, including GLSL-style built-in semantics
//! (floor-based `mod`, `sign(0) == 0`), so the software backend and the GPU
//! backend draw the same picture.

pub mod bodies;
pub mod compose;
pub mod glsl;
pub mod intersect;
pub mod noise;
pub mod texture;

pub use bodies::{AXIAL_TILT_DEGREES, CORONA_WIDTH, corona, shade_earth, shade_moon, shade_sun};
pub use compose::{ShadingContext, Visible, pixel_ndc};
pub use intersect::{Ray, intersect_sphere, occluded};
pub use noise::{MAX_OCTAVES, corona_turbulence, fractal_turbulence, noise};
pub use texture::{TextureImage, WrapMode};
