//! Shipped WGSL sources and the uniform names they declare.

/// Full-screen quad vertex stage (`aPos` at location 0, `vPos` out).
pub const VERTEX_SOURCE: &str = include_str!("shaders/fullscreen.vert.wgsl");

/// Noise helpers prepended to every fragment program.
pub const NOISE_HEADER: &str = include_str!("shaders/noise.wgsl");

/// The ray-traced scene, without the noise header.
pub const FRAGMENT_BODY: &str = include_str!("shaders/orrery.frag.wgsl");

/// Uniform and sampler names read by the shipped fragment program.
pub mod names {
    pub const CAMERA_POS: &str = "uCameraPos";
    pub const CAMERA_DIR: &str = "uCameraDir";
    pub const CAMERA_UP: &str = "uCameraUp";
    pub const SUN_POS: &str = "uSunPos";
    pub const SUN_RADIUS: &str = "uSunRadius";
    pub const SUN_COLOR: &str = "uSunColor";
    pub const EARTH_POS: &str = "uEarthPos";
    pub const EARTH_RADIUS: &str = "uEarthRadius";
    pub const EARTH_COLOR: &str = "uEarthColor";
    pub const MOON_POS: &str = "uMoonPos";
    pub const MOON_RADIUS: &str = "uMoonRadius";
    pub const MOON_COLOR: &str = "uMoonColor";
    pub const EARTH_TEXTURE: &str = "uEarthTexture";
    pub const MOON_TEXTURE: &str = "uMoonTexture";
    pub use orrery_scene::{RESOLUTION_UNIFORM as RESOLUTION, TIME_UNIFORM as TIME};
}

/// Vertex source plus fragment body of one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSources {
    pub vertex: String,
    /// Fragment source without the noise header.
    pub fragment: String,
}

impl ProgramSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// The fragment text actually compiled: header followed by body.
    pub fn fragment_program(&self) -> String {
        format!("{NOISE_HEADER}\n{}", self.fragment)
    }
}

impl Default for ProgramSources {
    fn default() -> Self {
        Self::new(VERTEX_SOURCE, FRAGMENT_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_program_starts_with_header() {
        let sources = ProgramSources::default();
        let text = sources.fragment_program();
        assert!(text.starts_with(NOISE_HEADER));
        assert!(text.ends_with(FRAGMENT_BODY));
        assert!(text.contains("fn noise("));
        assert!(text.contains("fn fs_main("));
    }

    #[test]
    fn test_body_declares_every_name() {
        for name in [
            names::CAMERA_POS,
            names::CAMERA_DIR,
            names::CAMERA_UP,
            names::SUN_POS,
            names::SUN_RADIUS,
            names::EARTH_POS,
            names::MOON_COLOR,
            names::EARTH_TEXTURE,
            names::MOON_TEXTURE,
            names::TIME,
            names::RESOLUTION,
        ] {
            assert!(FRAGMENT_BODY.contains(name), "{name}");
        }
    }
}
