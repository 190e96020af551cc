//! Scene configuration: the camera, the three bodies, and the named uniform,
//! texture and orbit tables that drive the fragment program.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity of one of the three bodies in the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyId {
    Sun,
    Earth,
    Moon,
}

impl BodyId {
    /// All bodies, in dispatch order.
    pub const ALL: [BodyId; 3] = [BodyId::Sun, BodyId::Earth, BodyId::Moon];

    /// Lowercase display name.
    pub fn name(self) -> &'static str {
        match self {
            BodyId::Sun => "sun",
            BodyId::Earth => "earth",
            BodyId::Moon => "moon",
        }
    }
}

/// Semantic type tag of a uniform.
///
/// Serialized with the WebGL `uniform*` suffixes (`"1f"`, `"2f"`, `"3f"`,
/// `"1i"`) so scene files read the same way the tags are documented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// One `f32`.
    Scalar,
    /// Two `f32`s.
    Vec2,
    /// Three `f32`s.
    Vec3,
    /// Integer texture unit index for a sampler.
    Sampler,
}

impl Serialize for UniformKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for UniformKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        UniformKind::from_tag(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown uniform type tag '{tag}'")))
    }
}

impl UniformKind {
    /// Number of scalar components carried by a value of this kind.
    pub fn arity(self) -> usize {
        match self {
            UniformKind::Scalar | UniformKind::Sampler => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
        }
    }

    /// Parse a WebGL-style tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "1f" => Some(UniformKind::Scalar),
            "2f" => Some(UniformKind::Vec2),
            "3f" => Some(UniformKind::Vec3),
            "1i" => Some(UniformKind::Sampler),
            _ => None,
        }
    }

    /// The WebGL-style tag (`"3f"` etc).
    pub fn tag(self) -> &'static str {
        match self {
            UniformKind::Scalar => "1f",
            UniformKind::Vec2 => "2f",
            UniformKind::Vec3 => "3f",
            UniformKind::Sampler => "1i",
        }
    }
}

/// Live scene value a static uniform tracks instead of its initial value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniformSource {
    CameraPosition,
    CameraDirection,
    CameraUp,
    BodyCenter(BodyId),
    BodyRadius(BodyId),
    BodyColor(BodyId),
}

/// A named uniform: its kind, initial value and optional live source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformDef {
    pub kind: UniformKind,
    pub value: Vec<f32>,
    #[serde(default)]
    pub source: Option<UniformSource>,
}

impl UniformDef {
    fn tracking(kind: UniformKind, value: &[f32], source: UniformSource) -> Self {
        Self {
            kind,
            value: value.to_vec(),
            source: Some(source),
        }
    }
}

/// A texture bound to a sampler uniform of the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureDef {
    /// File path (relative to the asset root) or `http(s)://` URL.
    pub url: String,
    /// Sampler type tag; always `"1i"` for 2D textures.
    #[serde(default = "sampler_kind")]
    pub kind: UniformKind,
    /// Texture unit the image is bound to.
    pub unit: u32,
}

fn sampler_kind() -> UniformKind {
    UniformKind::Sampler
}

/// A circular orbit of one body around another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitDef {
    pub orbiter: BodyId,
    pub central: BodyId,
    pub orbit_radius: f32,
    /// Angular rate in radians per second.
    pub orbit_speed: f32,
    /// Place the orbiter on the opposite side of the central body.
    #[serde(default)]
    pub invert: bool,
    /// Phase at t = 0, in radians.
    #[serde(default)]
    pub angle_offset: f32,
}

/// Camera placement. Fixed for the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub up: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 32.0],
            direction: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
        }
    }
}

/// Geometry and base color of one body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
}

/// Everything the renderer needs to know about the scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub sun: BodyConfig,
    pub earth: BodyConfig,
    pub moon: BodyConfig,
    /// Static uniforms, keyed by program uniform name.
    pub uniforms: BTreeMap<String, UniformDef>,
    /// Textures, keyed by sampler uniform name.
    pub textures: BTreeMap<String, TextureDef>,
    /// Orbits, keyed by a descriptive name.
    pub orbits: BTreeMap<String, OrbitDef>,
}

impl SceneConfig {
    /// Configuration of the given body.
    pub fn body(&self, id: BodyId) -> &BodyConfig {
        match id {
            BodyId::Sun => &self.sun,
            BodyId::Earth => &self.earth,
            BodyId::Moon => &self.moon,
        }
    }
}

const EARTH_ORBIT_SPEED: f32 = 0.1;
const MOON_ORBIT_SPEED: f32 = 0.4;

impl Default for SceneConfig {
    fn default() -> Self {
        let camera = CameraConfig::default();
        let sun = BodyConfig {
            center: [0.0, 0.0, 0.0],
            radius: 8.0,
            color: [1.0, 0.35, 0.0],
        };
        let earth = BodyConfig {
            center: [-60.0, 0.0, 0.0],
            radius: 1.5,
            color: [0.2, 0.4, 1.0],
        };
        let moon = BodyConfig {
            center: [0.0, 0.0, 10.0],
            radius: 0.5,
            color: [0.5, 0.5, 0.5],
        };

        use UniformKind::{Scalar, Vec3};
        use UniformSource::*;
        let mut uniforms = BTreeMap::new();
        let mut track = |name: &str, def: UniformDef| {
            uniforms.insert(name.to_string(), def);
        };
        track(
            "uCameraPos",
            UniformDef::tracking(Vec3, &camera.position, CameraPosition),
        );
        track(
            "uCameraDir",
            UniformDef::tracking(Vec3, &camera.direction, CameraDirection),
        );
        track("uCameraUp", UniformDef::tracking(Vec3, &camera.up, CameraUp));
        for (prefix, id, body) in [
            ("uSun", BodyId::Sun, &sun),
            ("uEarth", BodyId::Earth, &earth),
            ("uMoon", BodyId::Moon, &moon),
        ] {
            track(
                &format!("{prefix}Pos"),
                UniformDef::tracking(Vec3, &body.center, BodyCenter(id)),
            );
            track(
                &format!("{prefix}Radius"),
                UniformDef::tracking(Scalar, &[body.radius], BodyRadius(id)),
            );
            track(
                &format!("{prefix}Color"),
                UniformDef::tracking(Vec3, &body.color, BodyColor(id)),
            );
        }

        let mut textures = BTreeMap::new();
        textures.insert(
            "uEarthTexture".to_string(),
            TextureDef {
                url: "textures/earth.jpg".to_string(),
                kind: UniformKind::Sampler,
                unit: 0,
            },
        );
        textures.insert(
            "uMoonTexture".to_string(),
            TextureDef {
                url: "textures/moon.jpg".to_string(),
                kind: UniformKind::Sampler,
                unit: 1,
            },
        );

        let mut orbits = BTreeMap::new();
        orbits.insert(
            "earth".to_string(),
            OrbitDef {
                orbiter: BodyId::Earth,
                central: BodyId::Sun,
                orbit_radius: sun.radius + 10.0,
                orbit_speed: EARTH_ORBIT_SPEED,
                invert: true,
                angle_offset: 0.0,
            },
        );
        orbits.insert(
            "moon".to_string(),
            OrbitDef {
                orbiter: BodyId::Moon,
                central: BodyId::Earth,
                orbit_radius: 3.0,
                orbit_speed: MOON_ORBIT_SPEED,
                invert: false,
                angle_offset: 0.0,
            },
        );

        Self {
            camera,
            sun,
            earth,
            moon,
            uniforms,
            textures,
            orbits,
        }
    }
}
