//! Program compilation, linking and reflection.
//!
//! WGSL is parsed and validated with `naga` before any GPU object exists, so a
//! bad program surfaces as a [`ProgramError`] instead of a device panic. The
//! validated fragment module is then reflected into a [`UniformLayout`] that
//! resolves uniform names to byte offsets.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use naga::{Binding, ImageClass, ImageDimension, ScalarKind, TypeInner, VectorSize};
use orrery_config::UniformKind;
use orrery_scene::UniformValue;

use crate::sources::ProgramSources;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Vertex input location of the quad position.
pub const POSITION_LOCATION: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgramError {
    /// A stage failed to parse or validate.
    #[error("cannot compile {stage} shader:\n\n{message}")]
    Compile { stage: ShaderStage, message: String },

    /// The stages compiled but do not form a usable program.
    #[error("cannot link program: {message}")]
    Link { message: String },
}

impl ProgramError {
    fn link(message: impl Into<String>) -> Self {
        ProgramError::Link {
            message: message.into(),
        }
    }
}

/// Where a uniform lives in the uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub kind: UniformKind,
    pub offset: u32,
}

/// A sampled texture and the sampler paired with it (`<name>Sampler`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub group: u32,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

/// Name resolution for one program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformLayout {
    /// `(group, binding)` of the uniform block, if the program has one.
    pub block_binding: Option<(u32, u32)>,
    /// Size of the uniform block in bytes.
    pub block_size: u32,
    uniforms: BTreeMap<String, UniformSlot>,
    textures: Vec<TextureSlot>,
}

impl UniformLayout {
    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn texture(&self, name: &str) -> Option<&TextureSlot> {
        self.textures.iter().find(|t| t.name == name)
    }

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    /// Kind a value bound under `name` must have.
    pub fn kind_of(&self, name: &str) -> Option<UniformKind> {
        self.uniform(name)
            .map(|slot| slot.kind)
            .or_else(|| self.texture(name).map(|_| UniformKind::Sampler))
    }

    /// Every resolvable name: block members, then texture slots.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.uniforms
            .keys()
            .map(String::as_str)
            .chain(self.textures.iter().map(|t| t.name.as_str()))
    }
}

/// Result of a single [`Program::bind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// The program declares no uniform with that name.
    Unknown,
    /// The value's kind differs from the declared kind.
    KindMismatch {
        expected: UniformKind,
        found: UniformKind,
    },
    /// A sampler value that is not a valid texture unit.
    InvalidUnit(i32),
}

/// A compiled and linked program with its current uniform values.
#[derive(Clone, Debug)]
pub struct Program {
    vertex_source: String,
    fragment_source: String,
    layout: UniformLayout,
    block: Vec<u8>,
    texture_units: BTreeMap<String, u32>,
    warned: HashSet<String>,
    dirty: bool,
}

impl Program {
    /// Parse, validate, link and reflect `sources`.
    pub fn compile(sources: &ProgramSources) -> Result<Self, ProgramError> {
        let fragment_source = sources.fragment_program();
        let vertex = parse_and_validate(ShaderStage::Vertex, &sources.vertex)?;
        let fragment = parse_and_validate(ShaderStage::Fragment, &fragment_source)?;
        link(&vertex, &fragment)?;
        let layout = reflect(&fragment)?;

        log::debug!(
            "Linked program: {} uniform(s), {} texture slot(s), {} byte block",
            layout.uniforms.len(),
            layout.textures.len(),
            layout.block_size
        );

        Ok(Self {
            vertex_source: sources.vertex.clone(),
            block: vec![0; layout.block_size as usize],
            fragment_source,
            layout,
            texture_units: BTreeMap::new(),
            warned: HashSet::new(),
            dirty: true,
        })
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// Header plus body, as validated.
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Set a uniform by name.
    ///
    /// Unknown names, kind mismatches and invalid texture units leave the
    /// program untouched and log a warning the first time a name misbehaves
    /// (debug afterwards, since the same bind repeats every frame).
    pub fn bind(&mut self, name: &str, value: UniformValue) -> BindOutcome {
        let outcome = self.try_bind(name, value);
        match outcome {
            BindOutcome::Bound => {}
            BindOutcome::Unknown => self.warn(name, format_args!("Uniform '{name}' not found")),
            BindOutcome::KindMismatch { expected, found } => self.warn(
                name,
                format_args!(
                    "Uniform '{name}' is '{}' but was given '{}'",
                    expected.tag(),
                    found.tag()
                ),
            ),
            BindOutcome::InvalidUnit(unit) => {
                self.warn(name, format_args!("Sampler '{name}' given invalid unit {unit}"))
            }
        }
        outcome
    }

    fn try_bind(&mut self, name: &str, value: UniformValue) -> BindOutcome {
        let Some(expected) = self.layout.kind_of(name) else {
            return BindOutcome::Unknown;
        };
        if expected != value.kind() {
            return BindOutcome::KindMismatch {
                expected,
                found: value.kind(),
            };
        }

        match value {
            UniformValue::Sampler(unit) => {
                let Ok(unit) = u32::try_from(unit) else {
                    return BindOutcome::InvalidUnit(unit);
                };
                self.texture_units.insert(name.to_string(), unit);
            }
            UniformValue::Scalar(x) => self.write(name, &[x]),
            UniformValue::Vec2(v) => self.write(name, &v.to_array()),
            UniformValue::Vec3(v) => self.write(name, &v.to_array()),
        }
        BindOutcome::Bound
    }

    fn write(&mut self, name: &str, components: &[f32]) {
        if let Some(slot) = self.layout.uniform(name) {
            let start = slot.offset as usize;
            let bytes: &[u8] = bytemuck::cast_slice(components);
            self.block[start..start + bytes.len()].copy_from_slice(bytes);
            self.dirty = true;
        }
    }

    fn warn(&mut self, name: &str, message: fmt::Arguments<'_>) {
        if self.warned.insert(name.to_string()) {
            log::warn!("{message}");
        } else {
            log::debug!("{message}");
        }
    }

    /// Current value of a block uniform or sampler. Unset uniforms read as
    /// zero, unset samplers as unit 0.
    pub fn read(&self, name: &str) -> Option<UniformValue> {
        if let Some(slot) = self.layout.uniform(name) {
            let at = |i: usize| {
                let start = slot.offset as usize + i * 4;
                bytemuck::pod_read_unaligned::<f32>(&self.block[start..start + 4])
            };
            return Some(match slot.kind {
                UniformKind::Scalar => UniformValue::Scalar(at(0)),
                UniformKind::Vec2 => UniformValue::Vec2(glam::Vec2::new(at(0), at(1))),
                UniformKind::Vec3 => UniformValue::Vec3(glam::Vec3::new(at(0), at(1), at(2))),
                UniformKind::Sampler => UniformValue::Sampler(at(0) as i32),
            });
        }
        self.layout
            .texture(name)
            .map(|_| UniformValue::Sampler(self.texture_unit(name).unwrap_or(0) as i32))
    }

    /// Texture unit a sampler slot reads from.
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.texture_units.get(name).copied()
    }

    /// Raw uniform block, laid out as the fragment program declares it.
    pub fn block_bytes(&self) -> &[u8] {
        &self.block
    }

    /// Whether the block changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

fn parse_and_validate(stage: ShaderStage, source: &str) -> Result<naga::Module, ProgramError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ProgramError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| ProgramError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;
    Ok(module)
}

fn entry_point<'m>(
    module: &'m naga::Module,
    name: &str,
    stage: naga::ShaderStage,
) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == stage)
}

fn locations(module: &naga::Module, ty: naga::Handle<naga::Type>, binding: Option<&Binding>) -> Vec<u32> {
    match binding {
        Some(Binding::Location { location, .. }) => vec![*location],
        Some(Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            TypeInner::Struct { members, .. } => members
                .iter()
                .flat_map(|m| locations(module, m.ty, m.binding.as_ref()))
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), ProgramError> {
    let vs = entry_point(vertex, VERTEX_ENTRY, naga::ShaderStage::Vertex).ok_or_else(|| {
        ProgramError::link(format!("vertex stage has no '{VERTEX_ENTRY}' entry point"))
    })?;
    let fs = entry_point(fragment, FRAGMENT_ENTRY, naga::ShaderStage::Fragment).ok_or_else(|| {
        ProgramError::link(format!("fragment stage has no '{FRAGMENT_ENTRY}' entry point"))
    })?;

    let vertex_inputs: Vec<u32> = vs
        .function
        .arguments
        .iter()
        .flat_map(|arg| locations(vertex, arg.ty, arg.binding.as_ref()))
        .collect();
    if !vertex_inputs.contains(&POSITION_LOCATION) {
        return Err(ProgramError::link(format!(
            "vertex stage does not read the quad position at location {POSITION_LOCATION}"
        )));
    }

    let vertex_outputs: Vec<u32> = vs
        .function
        .result
        .as_ref()
        .map(|r| locations(vertex, r.ty, r.binding.as_ref()))
        .unwrap_or_default();
    for arg in &fs.function.arguments {
        for location in locations(fragment, arg.ty, arg.binding.as_ref()) {
            if !vertex_outputs.contains(&location) {
                return Err(ProgramError::link(format!(
                    "fragment input at location {location} is not written by the vertex stage"
                )));
            }
        }
    }
    Ok(())
}

fn uniform_kind(inner: &TypeInner) -> Option<UniformKind> {
    match inner {
        TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(UniformKind::Scalar)
        }
        TypeInner::Vector { size, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
        {
            match size {
                VectorSize::Bi => Some(UniformKind::Vec2),
                VectorSize::Tri => Some(UniformKind::Vec3),
                VectorSize::Quad => None,
            }
        }
        _ => None,
    }
}

fn reflect(module: &naga::Module) -> Result<UniformLayout, ProgramError> {
    let mut layout = UniformLayout::default();
    let mut samplers: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    let mut images: Vec<(String, u32, u32)> = Vec::new();

    for (_, global) in module.global_variables.iter() {
        let (Some(name), Some(binding)) = (&global.name, &global.binding) else {
            continue;
        };
        let inner = &module.types[global.ty].inner;
        match (global.space, inner) {
            (naga::AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                if layout.block_binding.is_some() {
                    return Err(ProgramError::link(format!(
                        "uniform block '{name}' is the second block; only one is supported"
                    )));
                }
                layout.block_binding = Some((binding.group, binding.binding));
                layout.block_size = *span;
                for member in members {
                    let Some(member_name) = &member.name else {
                        continue;
                    };
                    match uniform_kind(&module.types[member.ty].inner) {
                        Some(kind) => {
                            layout.uniforms.insert(
                                member_name.clone(),
                                UniformSlot {
                                    kind,
                                    offset: member.offset,
                                },
                            );
                        }
                        None => log::debug!(
                            "Uniform '{member_name}' has a type that cannot be bound by name"
                        ),
                    }
                }
            }
            (naga::AddressSpace::Uniform, _) => {
                return Err(ProgramError::link(format!(
                    "uniform '{name}' must be a struct of named members"
                )));
            }
            (
                naga::AddressSpace::Handle,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
                },
            ) => images.push((name.clone(), binding.group, binding.binding)),
            (naga::AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                samplers.insert(name.clone(), (binding.group, binding.binding));
            }
            _ => {}
        }
    }

    for (name, group, texture_binding) in images {
        let sampler_name = format!("{name}Sampler");
        let Some(&(sampler_group, sampler_binding)) = samplers.get(&sampler_name) else {
            return Err(ProgramError::link(format!(
                "texture '{name}' has no sampler named '{sampler_name}'"
            )));
        };
        if sampler_group != group {
            return Err(ProgramError::link(format!(
                "texture '{name}' and '{sampler_name}' are in different bind groups"
            )));
        }
        layout.textures.push(TextureSlot {
            name,
            group,
            texture_binding,
            sampler_binding,
        });
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FRAGMENT_BODY, VERTEX_SOURCE, names};
    use glam::{Vec2, Vec3};
    use orrery_config::SceneConfig;

    fn shipped() -> Program {
        Program::compile(&ProgramSources::default()).unwrap()
    }

    #[test]
    fn test_shipped_program_compiles() {
        let program = shipped();
        assert_eq!(program.layout().block_binding, Some((0, 0)));
        assert!(program.layout().block_size > 0);
        assert_eq!(program.block_bytes().len(), program.layout().block_size as usize);
    }

    #[test]
    fn test_reflection_covers_every_configured_name() {
        let program = shipped();
        let layout = program.layout();
        let scene = SceneConfig::default();
        for (name, def) in &scene.uniforms {
            assert_eq!(layout.kind_of(name), Some(def.kind), "{name}");
        }
        for name in scene.textures.keys() {
            assert_eq!(layout.kind_of(name), Some(UniformKind::Sampler), "{name}");
        }
        assert_eq!(layout.kind_of(names::TIME), Some(UniformKind::Scalar));
        assert_eq!(layout.kind_of(names::RESOLUTION), Some(UniformKind::Vec2));
    }

    #[test]
    fn test_texture_slots_pair_with_samplers() {
        let program = shipped();
        let earth = program.layout().texture(names::EARTH_TEXTURE).unwrap();
        assert_eq!(earth.group, 1);
        assert_ne!(earth.texture_binding, earth.sampler_binding);
        assert_eq!(program.layout().textures().len(), 2);
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let broken = format!("{FRAGMENT_BODY}\nfn oops( {{");
        let err = Program::compile(&ProgramSources::new(VERTEX_SOURCE, broken)).unwrap_err();
        assert!(matches!(
            err,
            ProgramError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn test_vertex_type_error_is_compile_error() {
        let vertex = r#"
            @vertex
            fn vs_main(@location(0) aPos: vec3<f32>) -> @builtin(position) vec4<f32> {
                return undeclared_variable;
            }
        "#;
        let err = Program::compile(&ProgramSources::new(vertex, FRAGMENT_BODY)).unwrap_err();
        assert!(matches!(
            err,
            ProgramError::Compile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
    }

    #[test]
    fn test_unwritten_fragment_input_is_link_error() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(3) stray: vec3<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(stray, 1.0);
            }
        "#;
        let err = Program::compile(&ProgramSources::new(VERTEX_SOURCE, fragment)).unwrap_err();
        assert!(matches!(err, ProgramError::Link { .. }), "{err}");
    }

    #[test]
    fn test_missing_entry_point_is_link_error() {
        let fragment = r#"
            @fragment
            fn main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;
        let err = Program::compile(&ProgramSources::new(VERTEX_SOURCE, fragment)).unwrap_err();
        assert!(matches!(err, ProgramError::Link { .. }));
    }

    #[test]
    fn test_texture_without_sampler_is_link_error() {
        let fragment = r#"
            @group(1) @binding(0) var uLonely: texture_2d<f32>;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return textureLoad(uLonely, vec2<i32>(0, 0), 0);
            }
        "#;
        let err = Program::compile(&ProgramSources::new(VERTEX_SOURCE, fragment)).unwrap_err();
        assert!(matches!(err, ProgramError::Link { .. }));
    }

    #[test]
    fn test_bind_writes_and_reads_back() {
        let mut program = shipped();
        let pos = Vec3::new(1.0, -2.0, 3.5);
        assert_eq!(program.bind(names::SUN_POS, UniformValue::Vec3(pos)), BindOutcome::Bound);
        assert_eq!(program.read(names::SUN_POS), Some(UniformValue::Vec3(pos)));

        let res = Vec2::new(640.0, 480.0);
        program.bind(names::RESOLUTION, UniformValue::Vec2(res));
        assert_eq!(program.read(names::RESOLUTION), Some(UniformValue::Vec2(res)));
        // Neighbouring members are untouched.
        assert_eq!(program.read(names::SUN_RADIUS), Some(UniformValue::Scalar(0.0)));
    }

    #[test]
    fn test_unknown_name_leaves_state_untouched() {
        let mut program = shipped();
        program.take_dirty();
        let before = program.block_bytes().to_vec();
        assert_eq!(
            program.bind("uNotThere", UniformValue::Scalar(1.0)),
            BindOutcome::Unknown
        );
        assert_eq!(
            program.bind("uNotThere", UniformValue::Scalar(2.0)),
            BindOutcome::Unknown
        );
        assert_eq!(program.block_bytes(), &before[..]);
        assert!(!program.take_dirty());
    }

    #[test]
    fn test_kind_mismatch_leaves_state_untouched() {
        let mut program = shipped();
        program.bind(names::SUN_RADIUS, UniformValue::Scalar(8.0));
        let outcome = program.bind(names::SUN_RADIUS, UniformValue::Vec3(Vec3::ONE));
        assert_eq!(
            outcome,
            BindOutcome::KindMismatch {
                expected: UniformKind::Scalar,
                found: UniformKind::Vec3
            }
        );
        assert_eq!(program.read(names::SUN_RADIUS), Some(UniformValue::Scalar(8.0)));
    }

    #[test]
    fn test_sampler_binds_texture_unit() {
        let mut program = shipped();
        assert_eq!(program.texture_unit(names::MOON_TEXTURE), None);
        assert_eq!(
            program.bind(names::MOON_TEXTURE, UniformValue::Sampler(1)),
            BindOutcome::Bound
        );
        assert_eq!(program.texture_unit(names::MOON_TEXTURE), Some(1));
        assert_eq!(program.read(names::MOON_TEXTURE), Some(UniformValue::Sampler(1)));
        assert_eq!(
            program.bind(names::MOON_TEXTURE, UniformValue::Sampler(-1)),
            BindOutcome::InvalidUnit(-1)
        );
        assert_eq!(program.texture_unit(names::MOON_TEXTURE), Some(1));
    }

    #[test]
    fn test_dirty_flag_tracks_writes() {
        let mut program = shipped();
        assert!(program.take_dirty());
        assert!(!program.take_dirty());
        program.bind(names::TIME, UniformValue::Scalar(1.0));
        assert!(program.take_dirty());
    }
}
