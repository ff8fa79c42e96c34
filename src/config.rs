use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_ENTRIES;
use crate::location::Location;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub navigation: NavigationConfig,
    pub history: HistoryConfig,
    pub input: InputConfig,
    pub window: WindowConfig,
}

/// Where a new tab lands in its pane
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NewTabPosition {
    #[default]
    AfterCurrent,
    End,
}

/// Navigation behavior
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub new_tab_position: NewTabPosition,
    /// Drop the " - File Browser" title suffix
    pub always_use_browser: bool,
    /// Overrides the user's home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
}

/// Global history list
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    /// Keep history across restarts
    pub persist: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_entries: DEFAULT_MAX_ENTRIES,
            persist: true,
        }
    }
}

/// Mouse gestures
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub use_extra_mouse_buttons: bool,
    pub back_button: u16,
    pub forward_button: u16,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            use_extra_mouse_buttons: true,
            back_button: 8,
            forward_button: 9,
        }
    }
}

/// Initial window geometry
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub start_with_sidebar: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 800.0,
            height: 550.0,
            start_with_sidebar: true,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "heike-nav")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from file, or return defaults if file doesn't exist
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    /// Load from an explicit path. Unreadable or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default configuration");
                Config::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Create a default config file if it doesn't exist
    pub fn create_default() -> Result<(), ConfigError> {
        if let Some(path) = Self::config_path() {
            if !path.exists() {
                Config::default().save_to(&path)?;
            }
        }
        Ok(())
    }

    /// Home location: the configured override, else the user's home directory.
    pub fn home_location(&self) -> Location {
        if let Some(home) = &self.navigation.home {
            return Location::from_path(home);
        }
        directories::UserDirs::new()
            .map(|dirs| Location::from_path(dirs.home_dir()))
            .unwrap_or_else(|| Location::from("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.navigation.new_tab_position, NewTabPosition::AfterCurrent);
        assert!(!config.navigation.always_use_browser);
        assert_eq!(config.history.max_entries, 50);
        assert!(config.history.persist);
        assert_eq!(config.input.back_button, 8);
        assert_eq!(config.input.forward_button, 9);
        assert_eq!(config.window.width, 800.0);
        assert!(config.window.start_with_sidebar);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            "[navigation]\nnew_tab_position = \"end\"\n\n[input]\nback_button = 4\n",
        )
        .unwrap();
        assert_eq!(config.navigation.new_tab_position, NewTabPosition::End);
        assert_eq!(config.input.back_button, 4);
        assert_eq!(config.input.forward_button, 9);
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.navigation.always_use_browser = true;
        config.navigation.home = Some(PathBuf::from("/srv/files"));
        config.history.max_entries = 10;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.home_location(), Location::from("/srv/files"));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[navigation\nbroken").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(
            Config::load_from(&dir.path().join("missing.toml")),
            Config::default()
        );
    }
}
