//! GLSL built-ins whose semantics differ from the obvious Rust/glam method.

use glam::Vec3;

/// `mod(x, y)`: `x - y * floor(x / y)`. Unlike `%`, the result takes the sign
/// of `y`.
pub fn modulo(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// Component-wise [`modulo`].
pub fn modulo3(x: Vec3, y: Vec3) -> Vec3 {
    x - y * (x / y).floor()
}

/// `sign(x)`: -1, 0 or 1. `f32::signum` maps 0.0 to 1.0 instead.
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub fn sign3(v: Vec3) -> Vec3 {
    Vec3::new(sign(v.x), sign(v.y), sign(v.z))
}

/// `step(edge, x)`: 1 where `x >= edge`, else 0.
pub fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmpge(edge), Vec3::ONE, Vec3::ZERO)
}

/// `fract(x)`: `x - floor(x)`, always in [0, 1).
pub fn fract3(v: Vec3) -> Vec3 {
    v - v.floor()
}

/// Hermite interpolation between two edges. `edge0 > edge1` gives the
/// inverted ramp.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// `reflect(i, n)`: `i - 2 * dot(n, i) * n`.
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// `mix(a, b, t)`.
pub fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}
