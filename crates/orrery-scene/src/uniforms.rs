//! Mapping from simulation state to named, typed program inputs.

use std::collections::BTreeMap;

use glam::{Vec2, Vec3};
use orrery_config::{UniformDef, UniformKind, UniformSource};

use crate::state::SimulationState;

/// Elapsed seconds since start.
pub const TIME_UNIFORM: &str = "uTime";
/// Viewport size in pixels.
pub const RESOLUTION_UNIFORM: &str = "uResolution";

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    /// Texture unit index.
    Sampler(i32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Sampler(_) => UniformKind::Sampler,
        }
    }

    /// Build a value from raw components. `None` if the component count does
    /// not match the kind.
    pub fn from_components(kind: UniformKind, components: &[f32]) -> Option<Self> {
        if components.len() != kind.arity() {
            return None;
        }
        Some(match kind {
            UniformKind::Scalar => UniformValue::Scalar(components[0]),
            UniformKind::Vec2 => UniformValue::Vec2(Vec2::new(components[0], components[1])),
            UniformKind::Vec3 => {
                UniformValue::Vec3(Vec3::new(components[0], components[1], components[2]))
            }
            UniformKind::Sampler => UniformValue::Sampler(components[0] as i32),
        })
    }
}

/// Ordered list of uniforms for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformSet {
    entries: Vec<(String, UniformValue)>,
}

impl UniformSet {
    pub fn push(&mut self, name: impl Into<String>, value: UniformValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct StaticUniform {
    name: String,
    initial: UniformValue,
    source: Option<UniformSource>,
}

/// Precomputed static uniform table. Rebuilt only when the scene changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformSync {
    statics: Vec<StaticUniform>,
}

impl UniformSync {
    /// Validate static uniform definitions. Definitions whose value does not
    /// fit their kind, or whose live source produces a different kind, are
    /// logged and left out.
    pub fn new(defs: &BTreeMap<String, UniformDef>) -> Self {
        let mut statics = Vec::with_capacity(defs.len());
        for (name, def) in defs {
            if name == TIME_UNIFORM || name == RESOLUTION_UNIFORM {
                log::warn!("Static uniform '{name}' shadows a per-frame uniform; ignoring it");
                continue;
            }
            let Some(initial) = UniformValue::from_components(def.kind, &def.value) else {
                log::warn!(
                    "Uniform '{name}' declared as '{}' but has {} component(s); skipping",
                    def.kind.tag(),
                    def.value.len()
                );
                continue;
            };
            if let Some(source) = def.source
                && source_kind(source) != def.kind
            {
                log::warn!(
                    "Uniform '{name}' declared as '{}' but its source {source:?} is '{}'; skipping",
                    def.kind.tag(),
                    source_kind(source).tag()
                );
                continue;
            }
            statics.push(StaticUniform {
                name: name.clone(),
                initial,
                source: def.source,
            });
        }
        Self { statics }
    }

    /// Number of static uniforms that will be pushed each frame.
    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// All uniforms for the current frame: time and resolution first, then
    /// every static uniform with live sources resolved against `state`.
    pub fn collect(&self, state: &SimulationState, resolution: Vec2) -> UniformSet {
        let mut set = UniformSet::default();
        set.push(TIME_UNIFORM, UniformValue::Scalar(state.elapsed()));
        set.push(RESOLUTION_UNIFORM, UniformValue::Vec2(resolution));
        for uniform in &self.statics {
            let value = match uniform.source {
                Some(source) => resolve(source, state),
                None => uniform.initial,
            };
            set.push(uniform.name.clone(), value);
        }
        set
    }
}

fn source_kind(source: UniformSource) -> UniformKind {
    match source {
        UniformSource::BodyRadius(_) => UniformKind::Scalar,
        _ => UniformKind::Vec3,
    }
}

fn resolve(source: UniformSource, state: &SimulationState) -> UniformValue {
    let camera = state.camera();
    match source {
        UniformSource::CameraPosition => UniformValue::Vec3(camera.position),
        UniformSource::CameraDirection => UniformValue::Vec3(camera.direction),
        UniformSource::CameraUp => UniformValue::Vec3(camera.up),
        UniformSource::BodyCenter(id) => UniformValue::Vec3(state.body(id).center),
        UniformSource::BodyRadius(id) => UniformValue::Scalar(state.body(id).radius),
        UniformSource::BodyColor(id) => UniformValue::Vec3(state.body(id).color),
    }
}
