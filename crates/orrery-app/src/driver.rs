//! Startup and the per-frame kinematics → uniform sync → draw sequence.

use std::path::Path;

use glam::Vec2;
use orrery_config::SceneConfig;
use orrery_render::{
    BackendError, ProgramSources, RenderBackend, RenderContextError, TextureLoadError,
    load_textures,
};
use orrery_scene::{SceneError, SimulationState, UniformSync, UniformValue};
use tracing::{error, info, instrument};

/// Failures that stop the renderer before the first frame.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Context(#[from] RenderContextError),

    #[error(transparent)]
    Texture(#[from] TextureLoadError),

    #[error("failed to upload texture: {0}")]
    Upload(#[from] BackendError),

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),
}

/// The running scene on one backend.
pub struct SolarSystem<B: RenderBackend> {
    backend: B,
    program: Option<B::Program>,
    textures: Vec<B::Texture>,
    state: SimulationState,
    uniforms: UniformSync,
}

impl<B: RenderBackend> SolarSystem<B> {
    /// Compile the program, load and bind every texture, and build the
    /// simulation state.
    ///
    /// A program that fails to compile or link is logged and the system runs
    /// degraded, drawing blank frames. Texture and scene errors are fatal.
    #[instrument(skip_all, fields(textures = scene.textures.len(), orbits = scene.orbits.len()))]
    pub fn start(
        mut backend: B,
        scene: &SceneConfig,
        asset_root: &Path,
        sources: &ProgramSources,
    ) -> Result<Self, StartupError> {
        let state = SimulationState::from_config(scene)?;
        let uniforms = UniformSync::new(&scene.uniforms);

        let mut program = match backend.compile_program(sources) {
            Ok(program) => Some(program),
            Err(e) => {
                error!("{e}");
                None
            }
        };

        let loaded = load_textures(&scene.textures, asset_root)?;
        let mut textures = Vec::with_capacity(loaded.len());
        for texture in &loaded {
            let uploaded = backend.upload_texture(&texture.name, &texture.image)?;
            backend.bind_texture(texture.unit, &uploaded);
            if let Some(program) = &mut program {
                backend.bind_uniform(
                    program,
                    &texture.name,
                    UniformValue::Sampler(texture.unit as i32),
                );
            }
            textures.push(uploaded);
        }

        info!(
            "Started with {} static uniform(s), {} texture(s), {} orbit(s)",
            uniforms.static_count(),
            textures.len(),
            state.orbits().len()
        );

        Ok(Self {
            backend,
            program,
            textures,
            state,
            uniforms,
        })
    }

    /// Render one frame at `elapsed` seconds since start.
    pub fn frame(&mut self, elapsed: f32) -> Result<(), BackendError> {
        self.state.advance(elapsed);

        let (width, height) = self.backend.resolution();
        let set = self
            .uniforms
            .collect(&self.state, Vec2::new(width as f32, height as f32));

        match &mut self.program {
            Some(program) => {
                for (name, value) in set.iter() {
                    self.backend.bind_uniform(program, name, value);
                }
                self.backend.draw_full_screen_quad(program)
            }
            None => self.backend.draw_blank(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
    }

    /// Whether the program failed to build and frames are blank.
    pub fn is_degraded(&self) -> bool {
        self.program.is_none()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn program(&self) -> Option<&B::Program> {
        self.program.as_ref()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_render::{SoftwareBackend, names};
    use orrery_scene::BodyId;

    fn untextured_scene() -> SceneConfig {
        let mut scene = SceneConfig::default();
        scene.textures.clear();
        scene
    }

    #[test]
    fn test_frame_pushes_current_state() {
        let scene = untextured_scene();
        let mut system = SolarSystem::start(
            SoftwareBackend::new(8, 6),
            &scene,
            Path::new("."),
            &ProgramSources::default(),
        )
        .unwrap();
        system.frame(4.0).unwrap();

        let program = system.program().unwrap();
        assert_eq!(program.read(names::TIME), Some(UniformValue::Scalar(4.0)));
        assert_eq!(
            program.read(names::RESOLUTION),
            Some(UniformValue::Vec2(Vec2::new(8.0, 6.0)))
        );
        assert_eq!(
            program.read(names::MOON_POS),
            Some(UniformValue::Vec3(system.state().center(BodyId::Moon)))
        );
    }

    #[test]
    fn test_resize_feeds_resolution() {
        let scene = untextured_scene();
        let mut system = SolarSystem::start(
            SoftwareBackend::new(8, 6),
            &scene,
            Path::new("."),
            &ProgramSources::default(),
        )
        .unwrap();
        system.resize(20, 10);
        system.frame(0.0).unwrap();
        let program = system.program().unwrap();
        assert_eq!(
            program.read(names::RESOLUTION),
            Some(UniformValue::Vec2(Vec2::new(20.0, 10.0)))
        );
        assert_eq!(system.backend().framebuffer().dimensions(), (20, 10));
    }

    #[test]
    fn test_invalid_orbit_graph_is_fatal() {
        let mut scene = untextured_scene();
        if let Some(moon) = scene.orbits.get_mut("moon") {
            moon.central = BodyId::Moon;
        }
        let result = SolarSystem::start(
            SoftwareBackend::new(4, 4),
            &scene,
            Path::new("."),
            &ProgramSources::default(),
        );
        assert!(matches!(result, Err(StartupError::Scene(_))));
    }
}
