//! Explicit simulation state threaded through each frame.

use glam::Vec3;
use orrery_config::{BodyId, SceneConfig};

use crate::body::{Bodies, CelestialBody};
use crate::camera::Camera;
use crate::error::SceneError;
use crate::orbit::{OrbitBinding, order_bindings};

/// Bodies, camera and orbit bindings at a point in time.
///
/// The only per-frame mutation is [`SimulationState::advance`], which
/// rewrites orbiter centers from the elapsed time.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    bodies: Bodies,
    camera: Camera,
    orbits: Vec<OrbitBinding>,
    elapsed: f32,
}

impl SimulationState {
    /// Build state from a scene configuration. Orbiters start where their
    /// orbit puts them at t = 0.
    pub fn from_config(config: &SceneConfig) -> Result<Self, SceneError> {
        let orbits = order_bindings(&config.orbits)?;
        let mut state = Self {
            bodies: Bodies::from_config(config),
            camera: Camera::from(&config.camera),
            orbits,
            elapsed: 0.0,
        };
        state.advance(0.0);
        log::debug!(
            "Simulation state built with {} orbit binding(s)",
            state.orbits.len()
        );
        Ok(state)
    }

    /// Recompute every orbiter's center for `elapsed` seconds since start.
    ///
    /// Bindings run centrals-first, so a moon follows the earth's position
    /// for this same instant.
    pub fn advance(&mut self, elapsed: f32) {
        self.elapsed = elapsed;
        for orbit in &self.orbits {
            let central = self.bodies.get(orbit.central).center;
            let position = orbit.position_around(central, elapsed);
            self.bodies.get_mut(orbit.orbiter).center = position;
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> &CelestialBody {
        self.bodies.get(id)
    }

    /// Orbit bindings in evaluation order.
    pub fn orbits(&self) -> &[OrbitBinding] {
        &self.orbits
    }

    pub fn center(&self, id: BodyId) -> Vec3 {
        self.bodies.get(id).center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_config::OrbitDef;

    const EPS: f32 = 1e-3;

    #[test]
    fn test_default_scene_starts_earth_on_negative_x() {
        let scene = SceneConfig::default();
        let state = SimulationState::from_config(&scene).unwrap();
        let sun = state.center(BodyId::Sun);
        let expected = sun - (scene.sun.radius + 10.0) * Vec3::X;
        assert!((state.center(BodyId::Earth) - expected).length() < EPS);
    }

    #[test]
    fn test_quarter_period_rotates_earth() {
        let state_config = SceneConfig::default();
        let mut state = SimulationState::from_config(&state_config).unwrap();
        let earth = state
            .orbits()
            .iter()
            .find(|o| o.orbiter == BodyId::Earth)
            .unwrap()
            .clone();
        let quarter = earth.period().unwrap() / 4.0;

        state.advance(quarter);
        assert!((earth.angle_at(quarter) - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((state.center(BodyId::Earth) - Vec3::new(0.0, 0.0, -18.0)).length() < EPS);
    }

    #[test]
    fn test_moon_follows_current_earth() {
        let mut state = SimulationState::from_config(&SceneConfig::default()).unwrap();
        for t in [0.0, 1.0, 7.5, 123.4] {
            state.advance(t);
            let earth = state.center(BodyId::Earth);
            let moon = state.center(BodyId::Moon);
            assert!(((moon - earth).length() - 3.0).abs() < EPS, "t={t}");
            assert!((moon.y - earth.y).abs() < EPS);
        }
    }

    #[test]
    fn test_advance_is_a_pure_function_of_time() {
        let mut stepped = SimulationState::from_config(&SceneConfig::default()).unwrap();
        for step in 0..100 {
            stepped.advance(step as f32 * 0.37);
        }
        stepped.advance(5.0);

        let mut direct = SimulationState::from_config(&SceneConfig::default()).unwrap();
        direct.advance(5.0);
        assert_eq!(stepped, direct);
    }

    #[test]
    fn test_sun_never_moves() {
        let mut state = SimulationState::from_config(&SceneConfig::default()).unwrap();
        state.advance(42.0);
        assert_eq!(state.center(BodyId::Sun), Vec3::ZERO);
    }

    #[test]
    fn test_unbound_body_keeps_configured_center() {
        let mut scene = SceneConfig::default();
        scene.orbits.remove("moon");
        let mut state = SimulationState::from_config(&scene).unwrap();
        state.advance(10.0);
        assert_eq!(state.center(BodyId::Moon), Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn test_invalid_orbit_table_is_rejected() {
        let mut scene = SceneConfig::default();
        scene.orbits.insert(
            "loop".to_string(),
            OrbitDef {
                orbiter: BodyId::Earth,
                central: BodyId::Moon,
                orbit_radius: 1.0,
                orbit_speed: 1.0,
                invert: false,
                angle_offset: 0.0,
            },
        );
        assert!(SimulationState::from_config(&scene).is_err());
    }
}
