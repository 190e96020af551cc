//! Startup policy: texture failures are fatal, program failures degrade.

use std::path::Path;

use image::{Rgb, RgbImage};
use orrery_app::{SolarSystem, StartupError};
use orrery_config::SceneConfig;
use orrery_render::{ProgramSources, SoftwareBackend, TextureLoadError, sources::VERTEX_SOURCE};

fn write_default_textures(root: &Path) {
    std::fs::create_dir_all(root.join("textures")).unwrap();
    RgbImage::from_pixel(8, 8, Rgb([30, 80, 200]))
        .save(root.join("textures/earth.jpg"))
        .unwrap();
    RgbImage::from_pixel(8, 8, Rgb([120, 120, 120]))
        .save(root.join("textures/moon.jpg"))
        .unwrap();
}

#[test]
fn missing_texture_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let result = SolarSystem::start(
        SoftwareBackend::new(4, 4),
        &SceneConfig::default(),
        dir.path(),
        &ProgramSources::default(),
    );
    assert!(matches!(
        result,
        Err(StartupError::Texture(TextureLoadError::Io { .. }))
    ));
}

#[test]
fn default_scene_starts_with_both_textures() {
    let dir = tempfile::tempdir().unwrap();
    write_default_textures(dir.path());
    let system = SolarSystem::start(
        SoftwareBackend::new(4, 4),
        &SceneConfig::default(),
        dir.path(),
        &ProgramSources::default(),
    )
    .unwrap();
    assert!(!system.is_degraded());
    assert_eq!(system.texture_count(), 2);
    assert_eq!(
        system.program().and_then(|p| p.texture_unit("uMoonTexture")),
        Some(1)
    );
}

#[test]
fn broken_program_draws_blank_frames() {
    let dir = tempfile::tempdir().unwrap();
    write_default_textures(dir.path());
    let sources = ProgramSources::new(VERTEX_SOURCE, "@fragment fn fs_main( -> {");
    let mut system = SolarSystem::start(
        SoftwareBackend::new(6, 4),
        &SceneConfig::default(),
        dir.path(),
        &sources,
    )
    .unwrap();
    assert!(system.is_degraded());

    system.frame(1.0).unwrap();
    assert!(
        system
            .backend()
            .framebuffer()
            .pixels()
            .all(|p| p.0 == [0, 0, 0, 255])
    );
    // Kinematics keep running without a program.
    assert_eq!(system.state().elapsed(), 1.0);
}
