//! Inventory sources and dynamic inventory resolution.
//!
//! A dynamic source is resolved by running an external command whose
//! stdout is Ansible `--list` JSON. By default that is
//! `ansible-inventory --list -i {inventory}`; an executable inventory file
//! is run directly with `--list`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use super::Inventory;
use crate::error::{Error, Result};

/// Default command used to resolve a dynamic inventory source
pub const DEFAULT_DYNAMIC_COMMAND: &str = "ansible-inventory --list -i {inventory}";

/// Kind of inventory source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    #[default]
    Static,
    Dynamic,
}

impl std::str::FromStr for InventoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(Error::Config(format!(
                "unknown inventory type '{}' (expected static or dynamic)",
                other
            ))),
        }
    }
}

/// Where hosts come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    /// Inventory file or directory read directly
    Static(PathBuf),
    /// Inventory resolved through an external command
    Dynamic(PathBuf),
}

impl InventorySource {
    pub fn new(kind: InventoryKind, path: impl Into<PathBuf>) -> Self {
        match kind {
            InventoryKind::Static => Self::Static(path.into()),
            InventoryKind::Dynamic => Self::Dynamic(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Static(p) | Self::Dynamic(p) => p,
        }
    }

    pub fn kind(&self) -> InventoryKind {
        match self {
            Self::Static(_) => InventoryKind::Static,
            Self::Dynamic(_) => InventoryKind::Dynamic,
        }
    }

    /// Load the inventory this source points to
    pub async fn load(&self, dynamic: &DynamicInventory) -> Result<Inventory> {
        match self {
            Self::Static(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path.clone()));
                }
                Ok(Inventory::load(path)?)
            }
            Self::Dynamic(path) => dynamic.load(path).await,
        }
    }
}

impl fmt::Display for InventorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(p) => write!(f, "static:{}", p.display()),
            Self::Dynamic(p) => write!(f, "dynamic:{}", p.display()),
        }
    }
}

/// Runs the external command that produces a dynamic inventory
#[derive(Debug, Clone)]
pub struct DynamicInventory {
    command: String,
}

impl Default for DynamicInventory {
    fn default() -> Self {
        Self::new(DEFAULT_DYNAMIC_COMMAND)
    }
}

impl DynamicInventory {
    /// Create a resolver from a command line; `{inventory}` is replaced by
    /// the source path.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Build the argv used for a given source
    pub fn argv(&self, source: &Path) -> Result<Vec<String>> {
        if is_executable(source) {
            return Ok(vec![source.display().to_string(), "--list".to_string()]);
        }

        let source_str = source.display().to_string();
        let mut argv = shell_words::split(&self.command)
            .map_err(|e| Error::Config(format!("invalid dynamic inventory command: {}", e)))?;
        if argv.is_empty() {
            return Err(Error::Config("dynamic inventory command is empty".into()));
        }

        let mut substituted = false;
        for arg in &mut argv {
            if arg.contains("{inventory}") {
                *arg = arg.replace("{inventory}", &source_str);
                substituted = true;
            }
        }
        if !substituted {
            argv.push(source_str);
        }

        Ok(argv)
    }

    /// Run the command and parse its output into an inventory
    pub async fn load(&self, source: &Path) -> Result<Inventory> {
        let source_name = source.display().to_string();
        let argv = self.argv(source)?;
        debug!(command = ?argv, "running dynamic inventory command");

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await
            .map_err(|e| Error::dynamic_inventory(&source_name, format!("{}: {}", argv[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("command exited with {}", output.status),
                s => s.to_string(),
            };
            return Err(Error::dynamic_inventory(source_name, message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let inventory = Inventory::from_ansible_json(&stdout, source_name.clone())
            .map_err(|e| Error::dynamic_inventory(&source_name, e.to_string()))?;

        info!(
            source = %source_name,
            hosts = inventory.host_count(),
            "dynamic inventory imported"
        );
        Ok(inventory)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LIST_JSON: &str = r#"{
        "_meta": {"hostvars": {"sw1": {"ansible_host": "10.0.0.1"}}},
        "core": {"hosts": ["sw1"]}
    }"#;

    #[test]
    fn test_inventory_kind_from_str() {
        assert_eq!("Dynamic".parse::<InventoryKind>().unwrap(), InventoryKind::Dynamic);
        assert_eq!("static".parse::<InventoryKind>().unwrap(), InventoryKind::Static);
        assert!("sot".parse::<InventoryKind>().is_err());
    }

    #[test]
    fn test_argv_substitutes_inventory() {
        let dynamic = DynamicInventory::default();
        let argv = dynamic.argv(Path::new("fedele.yml")).unwrap();
        assert_eq!(argv, vec!["ansible-inventory", "--list", "-i", "fedele.yml"]);
    }

    #[test]
    fn test_argv_appends_source_without_placeholder() {
        let dynamic = DynamicInventory::new("cat");
        let argv = dynamic.argv(Path::new("inv.json")).unwrap();
        assert_eq!(argv, vec!["cat", "inv.json"]);
    }

    #[tokio::test]
    async fn test_load_from_command_output() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LIST_JSON.as_bytes()).unwrap();

        let dynamic = DynamicInventory::new("cat {inventory}");
        let inventory = dynamic.load(file.path()).await.unwrap();

        assert_eq!(inventory.host_count(), 1);
        assert_eq!(inventory.get_host("sw1").unwrap().address(), "10.0.0.1");
    }

    #[tokio::test]
    async fn test_failing_command_is_not_imported() {
        let dynamic = DynamicInventory::new("false");
        let err = dynamic.load(Path::new("fedele.yml")).await.unwrap_err();
        assert!(matches!(err, Error::DynamicInventory { .. }));
        assert!(err.to_string().contains("could not be imported"));
    }

    #[tokio::test]
    async fn test_missing_command_is_not_imported() {
        let dynamic = DynamicInventory::new("o4n-no-such-inventory-tool {inventory}");
        let err = dynamic.load(Path::new("fedele.yml")).await.unwrap_err();
        assert!(matches!(err, Error::DynamicInventory { .. }));
    }

    #[tokio::test]
    async fn test_static_source_missing_file() {
        let source = InventorySource::Static(PathBuf::from("/nonexistent/o4n/hosts"));
        let err = source.load(&DynamicInventory::default()).await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
