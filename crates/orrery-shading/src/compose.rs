//! Primary ray dispatch: camera ray per pixel, nearest-hit selection and
//! per-body shader dispatch.

use glam::{Vec2, Vec3};
use orrery_scene::{Camera, CelestialBody};

use crate::bodies::{corona, shade_earth, shade_moon, shade_sun};
use crate::intersect::{Ray, intersect_sphere};
use crate::texture::TextureImage;

/// Half of the vertical field of view.
const HALF_FOV_DEGREES: f32 = 30.0;

/// Initial "closest hit" distance.
const FAR: f32 = 1e20;

/// What a primary ray ends up showing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Visible {
    Background,
    Sun { t: f32 },
    /// The ray missed the sun but passed through its glow band.
    Corona { color: Vec3 },
    Earth { t: f32 },
    Moon { t: f32 },
}

/// Everything the fragment program reads for one frame.
#[derive(Clone, Copy, Debug)]
pub struct ShadingContext<'a> {
    pub camera: Camera,
    pub resolution: Vec2,
    pub time: f32,
    pub sun: CelestialBody,
    pub earth: CelestialBody,
    pub moon: CelestialBody,
    pub earth_texture: &'a TextureImage,
    pub moon_texture: &'a TextureImage,
}

impl ShadingContext<'_> {
    /// Camera ray through a point in normalized device coordinates.
    pub fn primary_ray(&self, ndc: Vec2) -> Ray {
        let aspect = self.resolution.x / self.resolution.y;
        let ndc = Vec2::new(ndc.x * aspect, ndc.y);
        let scale = HALF_FOV_DEGREES.to_radians().tan();
        let basis = self.camera.basis();
        let direction =
            (basis.forward + ndc.x * scale * basis.right + ndc.y * scale * basis.up).normalize();
        Ray::new(self.camera.position, direction)
    }

    /// Sequential nearest-wins selection: sun (or corona), then earth, then
    /// moon, each replacing the previous only when strictly closer. A corona
    /// keeps the far distance, so any earth or moon hit overrides it.
    pub fn classify(&self, ray: &Ray) -> Visible {
        let mut closest = FAR;
        let mut visible = Visible::Background;

        match intersect_sphere(ray, &self.sun) {
            Some(t) if t < closest => {
                closest = t;
                visible = Visible::Sun { t };
            }
            _ => {
                if let Some(color) = corona(ray, &self.sun, self.time) {
                    visible = Visible::Corona { color };
                }
            }
        }

        if let Some(t) = intersect_sphere(ray, &self.earth)
            && t < closest
        {
            closest = t;
            visible = Visible::Earth { t };
        }

        if let Some(t) = intersect_sphere(ray, &self.moon)
            && t < closest
        {
            visible = Visible::Moon { t };
        }

        visible
    }

    /// Color seen along `ray`.
    pub fn shade(&self, ray: &Ray) -> Vec3 {
        let eye = self.camera.position;
        match self.classify(ray) {
            Visible::Background => Vec3::ZERO,
            Visible::Sun { .. } => shade_sun(ray, &self.sun, self.time),
            Visible::Corona { color } => color,
            Visible::Earth { .. } => shade_earth(
                ray,
                &self.earth,
                &self.moon,
                self.sun.center,
                eye,
                self.earth_texture,
            ),
            Visible::Moon { .. } => shade_moon(
                ray,
                &self.moon,
                &self.earth,
                self.sun.center,
                eye,
                self.moon_texture,
            ),
        }
    }

    /// Color at a point in normalized device coordinates.
    pub fn shade_pixel(&self, ndc: Vec2) -> Vec3 {
        self.shade(&self.primary_ray(ndc))
    }
}

/// NDC of the center of pixel `(x, y)`, with row 0 at the top.
pub fn pixel_ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32 * 2.0 - 1.0,
        1.0 - (y as f32 + 0.5) / height as f32 * 2.0,
    )
}
