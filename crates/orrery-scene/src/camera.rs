//! Fixed look-direction camera.

use glam::Vec3;
use orrery_config::CameraConfig;

/// Camera placement: position, look direction and up hint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

/// Orthonormal camera frame derived from a [`Camera`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3) -> Self {
        Self {
            position,
            direction,
            up,
        }
    }

    /// forward = normalize(direction), right = normalize(forward x up),
    /// up = right x forward.
    pub fn basis(&self) -> CameraBasis {
        let forward = self.direction.normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        CameraBasis { forward, right, up }
    }
}

impl From<&CameraConfig> for Camera {
    fn from(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            direction: Vec3::from_array(config.direction),
            up: Vec3::from_array(config.up),
        }
    }
}
