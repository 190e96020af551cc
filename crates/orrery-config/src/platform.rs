//! OS-specific directory resolution.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const APP_NAME: &str = "orrery";

/// OS-specific directory paths for the application.
///
/// Each field resolves to the platform-appropriate location following OS
/// conventions (XDG on Linux, Known Folders on Windows, Library on macOS).
#[derive(Debug, Clone)]
pub struct PlatformDirs {
    /// User configuration: `config.ron`.
    pub config_dir: PathBuf,
    /// Log files.
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolve platform-specific directories without creating them on disk.
    pub fn resolve() -> Result<Self, ConfigError> {
        let config_base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let app_config = config_base.join(APP_NAME);

        Ok(Self {
            config_dir: app_config.join("config"),
            log_dir: app_config.join("logs"),
        })
    }

    /// Resolve directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Create all directories on disk.
    pub fn create_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.config_dir, &self.log_dir] {
            std::fs::create_dir_all(dir).map_err(ConfigError::WriteError)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_root_nests_under_app_name() {
        let dirs = PlatformDirs::resolve_with_root(Path::new("/tmp/base"));
        assert_eq!(dirs.config_dir, Path::new("/tmp/base/orrery/config"));
        assert_eq!(dirs.log_dir, Path::new("/tmp/base/orrery/logs"));
    }

    #[test]
    fn test_directory_creation() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();

        assert!(dirs.config_dir.exists(), "config_dir was not created");
        assert!(dirs.log_dir.exists(), "log_dir was not created");
    }
}
