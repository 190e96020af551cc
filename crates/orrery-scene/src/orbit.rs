//! Closed-form circular orbits.
//!
//! Orbit position is a pure function of elapsed time; nothing accumulates
//! between frames.

use std::collections::BTreeMap;

use glam::Vec3;
use orrery_config::{BodyId, OrbitDef};

use crate::error::SceneError;

/// One body orbiting another on a circle in the central body's XZ plane.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitBinding {
    /// Key the binding was configured under.
    pub name: String,
    pub orbiter: BodyId,
    pub central: BodyId,
    pub orbit_radius: f32,
    /// Radians per second.
    pub orbit_speed: f32,
    pub invert: bool,
    /// Phase at t = 0, in radians.
    pub angle_offset: f32,
}

impl OrbitBinding {
    pub fn from_def(name: &str, def: &OrbitDef) -> Self {
        Self {
            name: name.to_string(),
            orbiter: def.orbiter,
            central: def.central,
            orbit_radius: def.orbit_radius,
            orbit_speed: def.orbit_speed,
            invert: def.invert,
            angle_offset: def.angle_offset,
        }
    }

    /// Orbit phase at `elapsed` seconds.
    pub fn angle_at(&self, elapsed: f32) -> f32 {
        self.orbit_speed * elapsed + self.angle_offset
    }

    /// Time for one full revolution, or `None` for a stationary binding.
    pub fn period(&self) -> Option<f32> {
        (self.orbit_speed != 0.0).then(|| std::f32::consts::TAU / self.orbit_speed.abs())
    }

    /// Orbiter center at `elapsed` seconds given the central body's current
    /// center. `invert` places the orbiter on the opposite side. The result's
    /// y is the central body's y.
    pub fn position_around(&self, central_center: Vec3, elapsed: f32) -> Vec3 {
        let angle = self.angle_at(elapsed);
        let offset = self.orbit_radius * Vec3::new(angle.cos(), 0.0, angle.sin());
        if self.invert {
            central_center - offset
        } else {
            central_center + offset
        }
    }
}

/// Validate orbit definitions and order them so that every central body is
/// positioned before anything orbiting it.
///
/// Ties are broken by configuration key, which keeps the order stable.
pub fn order_bindings(defs: &BTreeMap<String, OrbitDef>) -> Result<Vec<OrbitBinding>, SceneError> {
    let mut owners: BTreeMap<BodyId, &str> = BTreeMap::new();
    for (name, def) in defs {
        if def.orbiter == def.central {
            return Err(SceneError::SelfOrbit {
                name: name.clone(),
                body: def.orbiter,
            });
        }
        if def.orbiter == BodyId::Sun {
            return Err(SceneError::ImmobileOrbiter { name: name.clone() });
        }
        if let Some(first) = owners.insert(def.orbiter, name) {
            return Err(SceneError::DuplicateOrbiter {
                body: def.orbiter,
                first: first.to_string(),
                second: name.clone(),
            });
        }
    }

    let mut pending: Vec<OrbitBinding> = defs
        .iter()
        .map(|(name, def)| OrbitBinding::from_def(name, def))
        .collect();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        // A binding is ready once its central body is not still waiting to move.
        let ready = pending
            .iter()
            .position(|b| !pending.iter().any(|other| other.orbiter == b.central));
        match ready {
            Some(index) => ordered.push(pending.remove(index)),
            None => {
                let mut cycle: Vec<BodyId> = pending.iter().map(|b| b.orbiter).collect();
                cycle.sort();
                return Err(SceneError::OrbitCycle(cycle));
            }
        }
    }

    Ok(ordered)
}
