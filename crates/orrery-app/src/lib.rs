//! Orrery application: the per-frame driver shared by every backend, the
//! winit window loop, and headless PNG rendering.

pub mod driver;
pub mod headless;
pub mod window;

pub use driver::{SolarSystem, StartupError};
pub use headless::{HeadlessError, HeadlessRequest, render_headless};
pub use window::{AppError, run};
