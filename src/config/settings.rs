use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::{EngineOptions, Mode};
use crate::util::paths::{config_path, preferences_path, remote_dir, snapshots_dir};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one file per captured identifier
    pub base_dir: PathBuf,
    /// Mode used when nothing is restored
    pub default_mode: Mode,
    /// Start in the last persisted mode
    pub restore_previous: bool,
    /// JSON file the mode is persisted to
    pub preferences_path: PathBuf,
    /// Directory object store for remote snapshots
    pub remote_dir: PathBuf,
    /// Module name to required identifiers
    pub modules: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: snapshots_dir(),
            default_mode: Mode::Disabled,
            restore_previous: true,
            preferences_path: preferences_path(),
            remote_dir: remote_dir(),
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    engine: Option<TomlEngineConfig>,
    remote: Option<TomlRemoteConfig>,
    modules: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlEngineConfig {
    base_dir: Option<PathBuf>,
    default_mode: Option<Mode>,
    restore_previous: Option<bool>,
    preferences: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRemoteConfig {
    directory: Option<PathBuf>,
}

impl Config {
    /// Load from `<data_dir>/config.toml`, writing the example file on first run.
    pub fn load() -> Self {
        let config_file = config_path();

        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Merge the file at `path` over the defaults. A missing or malformed
    /// file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No config file loaded");
                return config;
            }
        };

        let toml_config = match toml::from_str::<TomlConfig>(&contents) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                return config;
            }
        };

        let relative_to = path.parent().unwrap_or_else(|| Path::new("."));

        if let Some(engine) = toml_config.engine {
            if let Some(base_dir) = engine.base_dir {
                config.base_dir = resolve(relative_to, base_dir);
            }
            if let Some(mode) = engine.default_mode {
                config.default_mode = mode;
            }
            if let Some(restore) = engine.restore_previous {
                config.restore_previous = restore;
            }
            if let Some(preferences) = engine.preferences {
                config.preferences_path = resolve(relative_to, preferences);
            }
        }

        if let Some(remote) = toml_config.remote {
            if let Some(directory) = remote.directory {
                config.remote_dir = resolve(relative_to, directory);
            }
        }

        if let Some(modules) = toml_config.modules {
            config.modules = modules;
        }

        config
    }

    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                return;
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write default config");
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_mode: self.default_mode,
            restore_previous: self.restore_previous,
            base_dir: self.base_dir.clone(),
        }
    }
}

fn resolve(relative_to: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        relative_to.join(path)
    }
}
