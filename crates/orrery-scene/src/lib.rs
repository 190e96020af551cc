//! Scene state for the orrery: bodies, camera, closed-form orbit kinematics,
//! the session clock, and the mapping from scene state to named uniforms.
//!
//! Nothing here touches a GPU. A frame is `SimulationState::advance` followed
//! by `UniformSync::collect`; the result is handed to a rendering backend.

pub mod body;
pub mod camera;
pub mod clock;
pub mod error;
pub mod orbit;
pub mod state;
pub mod uniforms;

pub use body::{Bodies, CelestialBody};
pub use camera::{Camera, CameraBasis};
pub use clock::Clock;
pub use error::SceneError;
pub use orbit::{OrbitBinding, order_bindings};
pub use orrery_config::BodyId;
pub use state::SimulationState;
pub use uniforms::{RESOLUTION_UNIFORM, TIME_UNIFORM, UniformSet, UniformSync, UniformValue};
