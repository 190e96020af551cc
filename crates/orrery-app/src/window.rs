//! Window creation and event handling via winit.
//!
//! [`OrreryApp`] implements winit's [`ApplicationHandler`]: the first
//! `resumed` creates the window, the GPU context and the scene, and every
//! redraw renders one frame and requests the next.

use std::sync::Arc;

use orrery_config::Config;
use orrery_render::{
    BackendError, GpuBackend, ProgramSources, SurfaceError, init_render_context_blocking,
};
use orrery_scene::Clock;
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::driver::{SolarSystem, StartupError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("GPU ran out of memory")]
    OutOfMemory,
}

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

pub struct OrreryApp {
    config: Config,
    window: Option<Arc<Window>>,
    system: Option<SolarSystem<GpuBackend>>,
    clock: Clock,
    failure: Option<AppError>,
}

impl OrreryApp {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            system: None,
            clock: Clock::start(),
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), StartupError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);
        let context = init_render_context_blocking(window.clone(), self.config.window.vsync)?;
        let system = SolarSystem::start(
            GpuBackend::new(context),
            &self.config.scene,
            &self.config.assets.root,
            &ProgramSources::default(),
        )?;
        if system.is_degraded() {
            warn!("Running without a usable program; frames will be blank");
        }

        self.system = Some(system);
        self.clock = Clock::start();
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.failure = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(system) = &mut self.system else {
            return;
        };
        match system.frame(self.clock.elapsed()) {
            Ok(()) => {}
            Err(BackendError::Surface(SurfaceError::Timeout)) => {
                warn!("Surface timeout, skipping frame");
            }
            Err(BackendError::Surface(SurfaceError::Lost)) => {
                warn!("Surface lost, reconfiguring");
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    system.resize(size.width, size.height);
                }
            }
            Err(BackendError::Surface(SurfaceError::OutOfMemory)) => {
                self.fail(event_loop, AppError::OutOfMemory);
                return;
            }
            Err(e) => warn!("Frame failed: {e}"),
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for OrreryApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && self.failure.is_none()
            && let Err(e) = self.start(event_loop)
        {
            self.fail(event_loop, e.into());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(system) = &mut self.system {
                    system.resize(new_size.width, new_size.height);
                    info!("Window resized to {}x{}", new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Creates an event loop and runs the orrery until the window closes.
#[instrument(skip_all)]
pub fn run(config: Config) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = OrreryApp::new(config);
    event_loop.run_app(&mut app)?;
    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
