//! Application paths.

use directories::ProjectDirs;
use std::path::PathBuf;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "config.json";

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the azcap application.
    #[must_use]
    pub fn new() -> Self {
        ProjectDirs::from("com", "azcap", "azcap").map_or_else(
            || {
                let home = directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
                Self {
                    config: home.join(".config/azcap"),
                }
            },
            |dirs| Self {
                config: dirs.config_dir().to_path_buf(),
            },
        )
    }

    /// Default config file in the platform config directory.
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
