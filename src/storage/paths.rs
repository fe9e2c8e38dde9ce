//! Application paths for configuration.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Platform paths for aigate.
    #[must_use]
    pub fn new() -> Self {
        ProjectDirs::from("", "", "aigate").map_or_else(
            || {
                // Fallback to home directory
                let home = directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
                Self {
                    config: home.join(".config/aigate"),
                }
            },
            |dirs| Self {
                config: dirs.config_dir().to_path_buf(),
            },
        )
    }

    /// Path to the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
