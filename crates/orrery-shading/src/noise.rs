//! Hash-based cellular noise and the two turbulence sums built on it.

use glam::{Vec3, Vec3Swizzles};

use crate::glsl::{fract3, modulo, modulo3, sign3, step3};

/// Lattice taps summed by [`noise`].
const NOISE_TAPS: u32 = 16;

/// Upper bound on octaves accepted by [`fractal_turbulence`].
pub const MAX_OCTAVES: u32 = 16;

/// Octaves of the domain-warped corona turbulence.
const CORONA_OCTAVES: u32 = 4;

/// Deterministic 3D noise in [-0.5, 0.5].
///
/// Sums sixteen offset lattice samples. Each sample picks a cell (snapped to
/// an alternating checkerboard along the dominant axis), hashes the cell
/// coordinates through `sin` into a direction, and weights the resulting
/// wave by `max(0, 1 - 2|P|^2)^4`.
pub fn noise(point: Vec3) -> f32 {
    let mut r = 0.0;
    for i in 0..NOISE_TAPS {
        let fi = i as f32;
        let lattice = modulo3(
            Vec3::new(fi, (i / 4) as f32, (i / 8) as f32),
            Vec3::new(4.0, 2.0, 2.0),
        );
        let jitter = 1.7 * Vec3::new(fi, 5.0 * fi, 8.0 * fi).map(f32::sin);
        let p = point + lattice + jitter;

        let mut cell = p.floor();
        let local = p - cell - 0.5;
        let a = local.abs();
        let parity = modulo(cell.x + cell.y + cell.z, 2.0);
        cell += parity * step3(a.yzx().max(a.zxy()), a) * sign3(local);

        let hash = 34.0 * (987.0 * fi + 876.0 * cell + 76.0 * cell.yzx() + 765.0 * cell.zxy()).map(f32::sin);
        let local = p - cell - 0.5;
        let falloff = (1.0 - 2.0 * local.dot(local)).max(0.0).powi(4);
        r += (6.3 * local.dot(fract3(hash) - 0.5)).sin() * falloff;
    }
    0.5 * r.sin()
}

/// Fractal sum `Σ amplitude * noise(frequency * point)`.
///
/// `octaves` is clamped to [`MAX_OCTAVES`].
pub fn fractal_turbulence(point: Vec3, octaves: u32, persistence: f32, lacunarity: f32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..octaves.min(MAX_OCTAVES) {
        value += amplitude * noise(point * frequency);
        amplitude *= persistence;
        frequency *= lacunarity;
    }
    value
}

/// Corona turbulence: `Σ |noise(s * P)| / s` where `P` is sheared by a
/// 30 degree rotation about Y and lifted by 100 between octaves.
pub fn corona_turbulence(point: Vec3) -> f32 {
    let mut f = 0.0;
    let mut s = 1.0;
    let mut p = point;
    for _ in 0..CORONA_OCTAVES {
        f += noise(s * p).abs() / s;
        s *= 2.0;
        p = Vec3::new(0.866 * p.x + 0.5 * p.z, p.y + 100.0, -0.5 * p.x + 0.866 * p.z);
    }
    f
}
