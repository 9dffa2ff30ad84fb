//! Configuration module for o4n
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/o4n/o4n.toml)
//! - User configuration (~/.o4n.toml, ~/.config/o4n/o4n.toml)
//! - Project configuration (./o4n.toml)
//! - Environment variables
//!
//! Command-line arguments are applied on top by the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::inventory::dynamic::DEFAULT_DYNAMIC_COMMAND;
use crate::inventory::InventoryKind;
use crate::scanner::{DEFAULT_FORKS, DEFAULT_PORT, DEFAULT_REPORT_PATH, DEFAULT_TIMEOUT_SECS};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// Reachability scan settings
    pub scan: ScanSettings,

    /// Dynamic inventory settings
    pub dynamic: DynamicSettings,

    /// Renderer settings
    pub render: RenderSettings,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// Default configuration values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Default inventory path
    pub inventory: Option<PathBuf>,

    /// Whether the inventory is a static file or a dynamic source
    pub inventory_type: InventoryKind,
}

/// Scan settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Port probed when the host declares none
    pub port: u16,

    /// Connect timeout in seconds
    pub timeout: f64,

    /// Concurrent probes
    pub forks: usize,

    /// Extra attempts per host
    pub retries: u32,

    /// Where the unreachable hosts report is written
    pub json_output: PathBuf,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT_SECS,
            forks: DEFAULT_FORKS,
            retries: 0,
            json_output: PathBuf::from(DEFAULT_REPORT_PATH),
        }
    }
}

/// Dynamic inventory settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSettings {
    /// Command producing `--list` JSON; `{inventory}` is replaced by the source
    pub command: String,
}

impl Default for DynamicSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_DYNAMIC_COMMAND.to_string(),
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Fail on undefined template variables
    pub strict: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when `-v` and `RUST_LOG` are absent
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Colors configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check, lowest priority first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/o4n/o4n.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".o4n.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("o4n/o4n.toml"));
        }

        paths.push(PathBuf::from("o4n.toml"));

        if let Ok(env_config) = std::env::var("O4N_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; non-default values in `other` win
    fn merge(&self, other: Config) -> Config {
        let scan_defaults = ScanSettings::default();

        Config {
            defaults: Defaults {
                inventory: other
                    .defaults
                    .inventory
                    .or_else(|| self.defaults.inventory.clone()),
                inventory_type: if other.defaults.inventory_type != InventoryKind::default() {
                    other.defaults.inventory_type
                } else {
                    self.defaults.inventory_type
                },
            },
            scan: ScanSettings {
                port: if other.scan.port != scan_defaults.port {
                    other.scan.port
                } else {
                    self.scan.port
                },
                timeout: if other.scan.timeout != scan_defaults.timeout {
                    other.scan.timeout
                } else {
                    self.scan.timeout
                },
                forks: if other.scan.forks != scan_defaults.forks {
                    other.scan.forks
                } else {
                    self.scan.forks
                },
                retries: if other.scan.retries != scan_defaults.retries {
                    other.scan.retries
                } else {
                    self.scan.retries
                },
                json_output: if other.scan.json_output != scan_defaults.json_output {
                    other.scan.json_output
                } else {
                    self.scan.json_output.clone()
                },
            },
            dynamic: if other.dynamic != DynamicSettings::default() {
                other.dynamic
            } else {
                self.dynamic.clone()
            },
            render: RenderSettings {
                strict: other.render.strict || self.render.strict,
            },
            logging: if other.logging != LoggingConfig::default() {
                other.logging
            } else {
                self.logging.clone()
            },
            colors: ColorsConfig {
                enabled: other.colors.enabled && self.colors.enabled,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // O4N_INVENTORY
        if let Ok(inventory) = std::env::var("O4N_INVENTORY") {
            self.defaults.inventory = Some(PathBuf::from(inventory));
        }

        // O4N_PORT
        if let Ok(port) = std::env::var("O4N_PORT") {
            if let Ok(n) = port.parse() {
                self.scan.port = n;
            }
        }

        // O4N_TIMEOUT
        if let Ok(timeout) = std::env::var("O4N_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.scan.timeout = n;
            }
        }

        // O4N_FORKS
        if let Ok(forks) = std::env::var("O4N_FORKS") {
            if let Ok(n) = forks.parse() {
                self.scan.forks = n;
            }
        }

        // O4N_DYNAMIC_COMMAND
        if let Ok(command) = std::env::var("O4N_DYNAMIC_COMMAND") {
            self.dynamic.command = command;
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("O4N_NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
    }

    /// Get the effective inventory path
    pub fn inventory_path(&self) -> Option<&PathBuf> {
        self.defaults.inventory.as_ref()
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.port, 22);
        assert_eq!(config.scan.forks, 5);
        assert_eq!(config.scan.timeout, 5.0);
        assert_eq!(config.scan.json_output, PathBuf::from("unavailable_hosts.json"));
        assert_eq!(config.defaults.inventory_type, InventoryKind::Static);
        assert!(config.colors.enabled);
    }

    #[test]
    fn test_config_merge() {
        let base = Config::default();
        let other = Config {
            scan: ScanSettings {
                forks: 10,
                ..ScanSettings::default()
            },
            ..Config::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.scan.forks, 10);
        assert_eq!(merged.scan.port, 22);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[defaults]\ninventory = \"fedele.yml\"\ninventory_type = \"dynamic\"\n\n[scan]\nport = 830\ntimeout = 2.5\n\n[dynamic]\ncommand = \"cat {{inventory}}\"\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.inventory_path(), Some(&PathBuf::from("fedele.yml")));
        assert_eq!(config.defaults.inventory_type, InventoryKind::Dynamic);
        assert_eq!(config.scan.port, 830);
        assert_eq!(config.scan.timeout, 2.5);
        assert_eq!(config.dynamic.command, "cat {inventory}");
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "scan:\n  forks: 20\nrender:\n  strict: true").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scan.forks, 20);
        assert!(config.render.strict);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scan\nport = ").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("O4N_FORKS", "20");
        std::env::set_var("O4N_DYNAMIC_COMMAND", "netbox-inventory {inventory}");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.scan.forks, 20);
        assert_eq!(config.dynamic.command, "netbox-inventory {inventory}");
        std::env::remove_var("O4N_FORKS");
        std::env::remove_var("O4N_DYNAMIC_COMMAND");
    }
}
