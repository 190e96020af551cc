//! CPU backend: runs the shading functions from `orrery-shading` per pixel.
//!
//! Programs are still validated and reflected through naga so uniform
//! binding behaves exactly as on the GPU; the draw itself reads the bound
//! values back by name.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use image::RgbaImage;
use orrery_scene::{Camera, CelestialBody, UniformValue};
use orrery_shading::{ShadingContext, TextureImage, pixel_ndc};
use rayon::prelude::*;

use crate::backend::{BackendError, RenderBackend};
use crate::program::{Program, ProgramError};
use crate::sources::{ProgramSources, names};

pub struct SoftwareBackend {
    framebuffer: RgbaImage,
    units: BTreeMap<u32, TextureImage>,
    fallback: TextureImage,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            framebuffer: RgbaImage::new(width.max(1), height.max(1)),
            units: BTreeMap::new(),
            fallback: TextureImage::white(),
        }
    }

    /// The last drawn frame, row 0 at the top.
    pub fn framebuffer(&self) -> &RgbaImage {
        &self.framebuffer
    }
}

fn scalar(program: &Program, name: &str) -> f32 {
    match program.read(name) {
        Some(UniformValue::Scalar(x)) => x,
        _ => 0.0,
    }
}

fn vec3(program: &Program, name: &str) -> Vec3 {
    match program.read(name) {
        Some(UniformValue::Vec3(v)) => v,
        _ => Vec3::ZERO,
    }
}

fn body(program: &Program, pos: &str, radius: &str, color: &str) -> CelestialBody {
    CelestialBody::new(
        vec3(program, pos),
        scalar(program, radius),
        vec3(program, color),
    )
}

/// Texture a sampler slot reads; unset samplers read unit 0.
fn slot_texture<'a>(
    program: &Program,
    units: &'a BTreeMap<u32, TextureImage>,
    fallback: &'a TextureImage,
    name: &str,
) -> &'a TextureImage {
    let unit = program.texture_unit(name).unwrap_or(0);
    units.get(&unit).unwrap_or(fallback)
}

fn to_rgba8(color: Vec3) -> [u8; 4] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

impl RenderBackend for SoftwareBackend {
    type Program = Program;
    type Texture = TextureImage;

    fn compile_program(&mut self, sources: &ProgramSources) -> Result<Program, ProgramError> {
        Program::compile(sources)
    }

    fn upload_texture(&mut self, _name: &str, image: &TextureImage) -> Result<TextureImage, BackendError> {
        Ok(image.clone())
    }

    fn bind_texture(&mut self, unit: u32, texture: &TextureImage) {
        self.units.insert(unit, texture.clone());
    }

    fn resolution(&self) -> (u32, u32) {
        self.framebuffer.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = RgbaImage::new(width.max(1), height.max(1));
    }

    fn draw_full_screen_quad(&mut self, program: &mut Program) -> Result<(), BackendError> {
        let resolution = match program.read(names::RESOLUTION) {
            Some(UniformValue::Vec2(v)) => v,
            _ => Vec2::ZERO,
        };
        let context = ShadingContext {
            camera: Camera::new(
                vec3(program, names::CAMERA_POS),
                vec3(program, names::CAMERA_DIR),
                vec3(program, names::CAMERA_UP),
            ),
            resolution,
            time: scalar(program, names::TIME),
            sun: body(program, names::SUN_POS, names::SUN_RADIUS, names::SUN_COLOR),
            earth: body(program, names::EARTH_POS, names::EARTH_RADIUS, names::EARTH_COLOR),
            moon: body(program, names::MOON_POS, names::MOON_RADIUS, names::MOON_COLOR),
            earth_texture: slot_texture(program, &self.units, &self.fallback, names::EARTH_TEXTURE),
            moon_texture: slot_texture(program, &self.units, &self.fallback, names::MOON_TEXTURE),
        };

        let (width, height) = self.framebuffer.dimensions();
        self.framebuffer
            .par_chunks_exact_mut((width * 4) as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                    let ndc = pixel_ndc(x as u32, y as u32, width, height);
                    pixel.copy_from_slice(&to_rgba8(context.shade_pixel(ndc)));
                }
            });
        Ok(())
    }

    fn draw_blank(&mut self) -> Result<(), BackendError> {
        for pixel in self.framebuffer.pixels_mut() {
            pixel.0 = [0, 0, 0, 255];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_config::SceneConfig;
    use orrery_scene::{SimulationState, UniformSync};

    fn bound_program(backend: &mut SoftwareBackend) -> Program {
        let mut program = backend.compile_program(&ProgramSources::default()).unwrap();
        let scene = SceneConfig::default();
        let state = SimulationState::from_config(&scene).unwrap();
        let (w, h) = backend.resolution();
        let uniforms = UniformSync::new(&scene.uniforms).collect(&state, Vec2::new(w as f32, h as f32));
        for (name, value) in uniforms.iter() {
            backend.bind_uniform(&mut program, name, value);
        }
        program
    }

    #[test]
    fn test_resize_clamps_to_one() {
        let mut backend = SoftwareBackend::new(4, 4);
        backend.resize(0, 0);
        assert_eq!(backend.resolution(), (1, 1));
    }

    #[test]
    fn test_draw_blank_is_black() {
        let mut backend = SoftwareBackend::new(3, 2);
        backend.draw_blank().unwrap();
        assert!(backend.framebuffer().pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_default_scene_center_shows_the_sun() {
        let mut backend = SoftwareBackend::new(33, 33);
        let mut program = bound_program(&mut backend);
        backend.draw_full_screen_quad(&mut program).unwrap();

        let center = backend.framebuffer().get_pixel(16, 16).0;
        assert!(center[0] > center[2], "{center:?}");
        assert!(center[0] > 100, "{center:?}");
        // Corners look past every body.
        assert_eq!(backend.framebuffer().get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_draw_is_deterministic() {
        let mut backend = SoftwareBackend::new(16, 12);
        let mut program = bound_program(&mut backend);
        backend.draw_full_screen_quad(&mut program).unwrap();
        let first = backend.framebuffer().clone();
        backend.draw_full_screen_quad(&mut program).unwrap();
        assert_eq!(&first, backend.framebuffer());
    }

    #[test]
    fn test_bound_texture_is_used_by_unit() {
        let mut backend = SoftwareBackend::new(2, 2);
        let red = TextureImage::solid([255, 0, 0, 255]);
        let texture = backend.upload_texture("uEarthTexture", &red).unwrap();
        backend.bind_texture(3, &texture);

        let mut program = backend.compile_program(&ProgramSources::default()).unwrap();
        program.bind(names::EARTH_TEXTURE, UniformValue::Sampler(3));
        let chosen = slot_texture(&program, &backend.units, &backend.fallback, names::EARTH_TEXTURE);
        assert_eq!(chosen, &red);
        let unbound = slot_texture(&program, &backend.units, &backend.fallback, names::MOON_TEXTURE);
        assert_eq!(unbound, &TextureImage::white());
    }

    #[test]
    fn test_color_quantization_clamps() {
        assert_eq!(to_rgba8(Vec3::new(2.0, -1.0, 0.5)), [255, 0, 128, 255]);
    }
}
