//! Per-body surface shaders.
//!
//! Each shader receives the primary ray and the bodies it needs, and returns
//! black when the ray misses its body. Composition decides which one runs.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};
use orrery_scene::CelestialBody;

use crate::glsl::{mix3, reflect, smoothstep};
use crate::intersect::{Ray, intersect_sphere, occluded};
use crate::noise::{corona_turbulence, fractal_turbulence, noise};
use crate::texture::TextureImage;

/// Width of the glow band outside the sun's surface.
pub const CORONA_WIDTH: f32 = 1.5;

/// Earth's axial tilt about the X axis.
pub const AXIAL_TILT_DEGREES: f32 = 23.5;

const SUN_PLASMA: Vec3 = Vec3::new(1.0, 0.4, 0.2);
const SUN_FLOW_TINT: Vec3 = Vec3::new(0.4, 0.7, 0.3);
const SUNSPOT: Vec3 = Vec3::new(1.0, 0.1, 0.1);
const MOON_GLOW: Vec3 = Vec3::splat(0.5);
const SHININESS: i32 = 32;

/// Longitude/latitude unwrap of a unit normal onto [0, 1]^2.
pub fn sphere_uv(normal: Vec3) -> Vec2 {
    let longitude = normal.z.atan2(normal.x);
    let latitude = normal.y.clamp(-1.0, 1.0).asin();
    Vec2::new((longitude + PI) / TAU, (latitude + FRAC_PI_2) / PI)
}

/// Rotate a normal by the axial tilt about X.
pub fn tilt_normal(normal: Vec3) -> Vec3 {
    let (s, c) = AXIAL_TILT_DEGREES.to_radians().sin_cos();
    Vec3::new(
        normal.x,
        c * normal.y + s * normal.z,
        -s * normal.y + c * normal.z,
    )
}

fn specular(view: Vec3, to_light: Vec3, normal: Vec3) -> f32 {
    view.dot(reflect(-to_light, normal)).max(0.0).powi(SHININESS)
}

/// Self-luminous plasma surface: orange base, a 6-octave turbulence flow and
/// a fine noise layer, both drifting with `time`, plus a sunspot mask.
pub fn shade_sun(ray: &Ray, sun: &CelestialBody, time: f32) -> Vec3 {
    let Some(t) = intersect_sphere(ray, sun) else {
        return Vec3::ZERO;
    };
    let hit = ray.at(t);
    let drift = Vec3::splat(time * 0.05);

    let turbulence = fractal_turbulence(hit + drift, 6, 0.7, 2.0);
    let fine = noise(hit * 10.0 + drift) * 0.01;
    let mut plasma = SUN_PLASMA + SUN_FLOW_TINT * (fine + turbulence);

    let spot_mask = smoothstep(0.23, 0.22, fine);
    plasma += mix3(SUNSPOT, Vec3::splat(0.01), spot_mask);
    plasma.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Glow for a ray that passes within [`CORONA_WIDTH`] of the sun's surface
/// without hitting it. `None` outside the band.
///
/// The closest approach is taken along the whole line, so a sun behind the
/// camera can still produce a corona.
pub fn corona(ray: &Ray, sun: &CelestialBody, time: f32) -> Option<Vec3> {
    let t = (sun.center - ray.origin).dot(ray.direction) / ray.direction.dot(ray.direction);
    let closest = ray.at(t);
    let distance = closest.distance(sun.center);
    let outer = sun.radius + CORONA_WIDTH;
    if !(distance > sun.radius && distance < outer) {
        return None;
    }

    let glow = (distance - sun.radius) / CORONA_WIDTH;
    let blend = smoothstep(sun.radius, sun.radius + 0.0001, distance);
    let falloff = (-(glow * 2.0).powi(2)).exp() * 10.0;
    let swirl = corona_turbulence((closest + Vec3::new(0.2, time * 0.2, 0.0)) * 0.2);
    let intensity = falloff * swirl * blend;

    Some(mix3(SUN_PLASMA, SUN_PLASMA * intensity, blend))
}

/// Textured moon with Phong lighting from the sun, earth shadow and a thin
/// gray rim glow.
pub fn shade_moon(
    ray: &Ray,
    moon: &CelestialBody,
    earth: &CelestialBody,
    sun_center: Vec3,
    camera_position: Vec3,
    texture: &TextureImage,
) -> Vec3 {
    let Some(t) = intersect_sphere(ray, moon) else {
        return Vec3::ZERO;
    };
    let hit = ray.at(t);
    let normal = (hit - moon.center).normalize();
    let albedo = texture.sample_rgb(sphere_uv(normal));

    let to_light = (sun_center - hit).normalize();
    let view = (camera_position - hit).normalize();
    let light_distance = sun_center.distance(hit);

    let phong = if occluded(hit, normal, to_light, light_distance, earth) {
        0.15 * moon.color
    } else {
        let ambient = 0.4 * moon.color;
        let diffuse = normal.dot(to_light).max(0.0) * moon.color;
        let highlight = Vec3::splat(specular(view, to_light, normal));
        ambient + diffuse + highlight
    };

    let rim = hit.distance(moon.center) - moon.radius;
    let glow = MOON_GLOW * (-(rim / 0.3).powi(2)).exp() * 0.4;
    phong * albedo + glow
}

/// Textured earth lit from the sun with the normal tilted by
/// [`AXIAL_TILT_DEGREES`]. The moon shadows the lit hemisphere.
pub fn shade_earth(
    ray: &Ray,
    earth: &CelestialBody,
    moon: &CelestialBody,
    sun_center: Vec3,
    camera_position: Vec3,
    texture: &TextureImage,
) -> Vec3 {
    let Some(t) = intersect_sphere(ray, earth) else {
        return Vec3::ZERO;
    };
    let hit = ray.at(t);
    let normal = (hit - earth.center).normalize();
    let tilted = tilt_normal(normal);
    let albedo = texture.sample_rgb(sphere_uv(tilted));

    let to_light = (sun_center - hit).normalize();
    let facing = tilted.dot(to_light);
    // The shadow ray leaves along the untilted normal.
    let shadowed =
        facing > 0.0 && occluded(hit, normal, to_light, sun_center.distance(hit), moon);

    let view = (camera_position - hit).normalize();
    let ambient = 0.6 * albedo;
    let phong = if shadowed {
        ambient
    } else {
        let diffuse = 10.0 * facing.max(0.0) * earth.color;
        let highlight = Vec3::splat(0.5 * specular(view, to_light, tilted));
        ambient + diffuse + highlight
    };
    (phong * albedo).clamp(Vec3::ZERO, Vec3::ONE)
}
