//! Scene configuration errors.

use orrery_config::BodyId;

/// Ways an orbit table can fail to describe a valid set of circular orbits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// A body was configured to orbit itself.
    #[error("orbit '{name}': {body:?} cannot orbit itself")]
    SelfOrbit { name: String, body: BodyId },

    /// The sun is the fixed root of every orbit chain.
    #[error("orbit '{name}': the sun is immobile and cannot be an orbiter")]
    ImmobileOrbiter { name: String },

    /// A body appears as orbiter in more than one binding.
    #[error("{body:?} is bound as orbiter by both '{first}' and '{second}'")]
    DuplicateOrbiter {
        body: BodyId,
        first: String,
        second: String,
    },

    /// The orbit bindings reference each other in a loop.
    #[error("orbit bindings form a cycle through {0:?}")]
    OrbitCycle(Vec<BodyId>),
}
