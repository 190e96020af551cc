//! Ray-sphere intersection and shadow rays.

use glam::Vec3;
use orrery_scene::CelestialBody;

/// Offset along the surface normal applied to shadow ray origins.
pub const SHADOW_EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

/// Ray parameter of the nearest non-negative intersection with `body`.
///
/// Solves `|o + t d - c|^2 = r^2`. The smaller root wins unless it lies
/// behind the origin, in which case the larger root is used (origin inside
/// the sphere). `None` when the ray misses or the sphere is entirely behind.
pub fn intersect_sphere(ray: &Ray, body: &CelestialBody) -> Option<f32> {
    let oc = ray.origin - body.center;
    let a = ray.direction.dot(ray.direction);
    if a <= 0.0 {
        return None;
    }
    let b = 2.0 * oc.dot(ray.direction);
    let c = oc.dot(oc) - body.radius * body.radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    if near >= 0.0 {
        return Some(near);
    }
    let far = (-b + root) / (2.0 * a);
    (far >= 0.0).then_some(far)
}

/// Whether `occluder` blocks the light seen from a surface point.
///
/// The shadow ray starts at `point` nudged by [`SHADOW_EPSILON`] along
/// `normal` and travels along `to_light` (unit length). The point is shadowed
/// iff the occluder is hit strictly closer than `light_distance`.
pub fn occluded(
    point: Vec3,
    normal: Vec3,
    to_light: Vec3,
    light_distance: f32,
    occluder: &CelestialBody,
) -> bool {
    let shadow_ray = Ray::new(point + normal * SHADOW_EPSILON, to_light);
    intersect_sphere(&shadow_ray, occluder).is_some_and(|t| t < light_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(center: Vec3, radius: f32) -> CelestialBody {
        CelestialBody::new(center, radius, Vec3::ONE)
    }

    #[test]
    fn test_miss_when_discriminant_negative() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(intersect_sphere(&ray, &sphere(Vec3::new(5.0, 0.0, -10.0), 1.0)), None);
    }

    #[test]
    fn test_smaller_root_when_both_positive() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = intersect_sphere(&ray, &sphere(Vec3::new(0.0, 0.0, -10.0), 2.0)).unwrap();
        assert!((t - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_larger_root_from_inside() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = intersect_sphere(&ray, &sphere(Vec3::new(0.0, 0.0, -1.0), 2.0)).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_miss_when_sphere_behind() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(intersect_sphere(&ray, &sphere(Vec3::new(0.0, 0.0, 10.0), 2.0)), None);
    }

    #[test]
    fn test_unnormalized_direction_scales_t() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0));
        let t = intersect_sphere(&ray, &sphere(Vec3::new(0.0, 0.0, -10.0), 2.0)).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!((ray.at(t) - Vec3::new(0.0, 0.0, -8.0)).length() < 1e-4);
    }

    #[test]
    fn test_grazing_ray_hits() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_Z);
        let t = intersect_sphere(&ray, &sphere(Vec3::new(0.0, 0.0, -5.0), 1.0)).unwrap();
        assert!((t - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_direction_misses() {
        let ray = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(intersect_sphere(&ray, &sphere(Vec3::ZERO, 1.0)), None);
    }

    #[test]
    fn test_occluder_between_point_and_light() {
        let light = Vec3::new(10.0, 0.0, 0.0);
        let point = Vec3::ZERO;
        let occluder = sphere(Vec3::new(5.0, 0.0, 0.0), 1.0);
        let to_light = (light - point).normalize();
        assert!(occluded(point, to_light, to_light, light.distance(point), &occluder));
    }

    #[test]
    fn test_occluder_behind_light() {
        let light = Vec3::new(10.0, 0.0, 0.0);
        let point = Vec3::ZERO;
        let occluder = sphere(Vec3::new(15.0, 0.0, 0.0), 1.0);
        let to_light = (light - point).normalize();
        assert!(!occluded(point, to_light, to_light, light.distance(point), &occluder));
    }

    #[test]
    fn test_occluder_behind_point() {
        let occluder = sphere(Vec3::new(-5.0, 0.0, 0.0), 1.0);
        assert!(!occluded(Vec3::ZERO, Vec3::X, Vec3::X, 10.0, &occluder));
    }
}
