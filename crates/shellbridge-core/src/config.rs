use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub server: ServerConfig,
    pub battery: BatteryConfig,
    pub apps: AppsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path of the Unix socket the daemon listens on.
    /// Empty means the runtime-dir default.
    pub socket_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// How often the battery device is sampled, in milliseconds
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppsConfig {
    /// Extra directories to scan for .desktop files, besides the XDG set
    pub extra_dirs: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: String::new(),
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            extra_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("shellbridge")
            .join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, or return defaults if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("[shellbridge] Failed to parse config: {}", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    eprintln!("[shellbridge] Failed to read config: {}", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.battery.poll_interval_ms = self.battery.poll_interval_ms.clamp(200, 60_000);
    }

    /// Resolve the socket path, falling back to the runtime directory.
    pub fn socket_path(&self) -> PathBuf {
        if !self.server.socket_path.is_empty() {
            return PathBuf::from(&self.server.socket_path);
        }
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        runtime_dir.join("shellbridge.sock")
    }

    /// Extra .desktop directories as paths
    pub fn extra_app_dirs(&self) -> Vec<PathBuf> {
        self.apps.extra_dirs.iter().map(PathBuf::from).collect()
    }
}
