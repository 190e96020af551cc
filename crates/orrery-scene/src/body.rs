//! Celestial bodies as plain values.

use glam::Vec3;
use orrery_config::{BodyConfig, BodyId, SceneConfig};

/// A sphere with a base color. `center` is the only field that moves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CelestialBody {
    pub center: Vec3,
    pub radius: f32,
    pub color: Vec3,
}

impl CelestialBody {
    pub fn new(center: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            center,
            radius,
            color,
        }
    }
}

impl From<&BodyConfig> for CelestialBody {
    fn from(config: &BodyConfig) -> Self {
        Self {
            center: Vec3::from_array(config.center),
            radius: config.radius,
            color: Vec3::from_array(config.color),
        }
    }
}

/// The three bodies of the scene, addressed by [`BodyId`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bodies {
    pub sun: CelestialBody,
    pub earth: CelestialBody,
    pub moon: CelestialBody,
}

impl Bodies {
    pub fn from_config(config: &SceneConfig) -> Self {
        Self {
            sun: CelestialBody::from(&config.sun),
            earth: CelestialBody::from(&config.earth),
            moon: CelestialBody::from(&config.moon),
        }
    }

    pub fn get(&self, id: BodyId) -> &CelestialBody {
        match id {
            BodyId::Sun => &self.sun,
            BodyId::Earth => &self.earth,
            BodyId::Moon => &self.moon,
        }
    }

    pub fn get_mut(&mut self, id: BodyId) -> &mut CelestialBody {
        match id {
            BodyId::Sun => &mut self.sun,
            BodyId::Earth => &mut self.earth,
            BodyId::Moon => &mut self.moon,
        }
    }
}
