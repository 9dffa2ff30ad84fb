//! Host definition for the o4n inventory.
//!
//! A `Host` is one inventory entry: its name, the address to probe and any
//! variables declared alongside it.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A host in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Host name (inventory alias)
    pub name: String,

    /// Actual hostname or IP to connect to (if different from name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ansible_host: Option<String>,

    /// Management port declared with `ansible_port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Host-specific variables
    #[serde(default)]
    pub vars: IndexMap<String, serde_yaml::Value>,

    /// Groups this host belongs to
    #[serde(skip)]
    pub groups: IndexSet<String>,
}

impl Host {
    /// Create a new host with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ansible_host: None,
            port: None,
            vars: IndexMap::new(),
            groups: IndexSet::new(),
        }
    }

    /// Create a new host with hostname/IP
    pub fn with_address(name: impl Into<String>, address: impl Into<String>) -> Self {
        let mut host = Self::new(name);
        host.ansible_host = Some(address.into());
        host
    }

    /// Get the actual address to connect to
    pub fn address(&self) -> &str {
        self.ansible_host.as_deref().unwrap_or(&self.name)
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.vars.insert(key.into(), value);
    }

    pub fn get_var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }

    pub fn add_to_group(&mut self, group: impl Into<String>) {
        self.groups.insert(group.into());
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Merge variables from another source (other takes precedence)
    pub fn merge_vars(&mut self, other: &IndexMap<String, serde_yaml::Value>) {
        for (key, value) in other {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    /// Apply one inventory variable, routing connection keys to their fields.
    pub fn apply_var(&mut self, key: &str, value: serde_yaml::Value) -> Result<(), HostParseError> {
        match key {
            "ansible_host" | "ansible_ssh_host" => {
                self.ansible_host = Some(yaml_scalar_to_string(&value));
            }
            "ansible_port" | "ansible_ssh_port" => {
                self.port = Some(parse_port(&value)?);
            }
            _ => self.set_var(key, value),
        }
        Ok(())
    }

    /// Parse an INI host line (e.g. `sw-core-1 ansible_host=10.0.0.101 ansible_port=22`).
    ///
    /// Values may be quoted; quoting follows shell rules.
    pub fn parse(input: &str) -> Result<Self, HostParseError> {
        let parts = shell_words::split(input)
            .map_err(|e| HostParseError::InvalidSyntax(format!("{}: {}", input, e)))?;
        let mut parts = parts.into_iter();

        let name = parts.next().ok_or(HostParseError::EmptyInput)?;
        let mut host = Host::new(name);

        for part in parts {
            if let Some((key, value)) = part.split_once('=') {
                host.apply_var(key, parse_ini_value(value))?;
            }
        }

        Ok(host)
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Host {}

impl std::hash::Hash for Host {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(addr) = &self.ansible_host {
            write!(f, " ({})", addr)?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing a host definition
#[derive(Debug, thiserror::Error)]
pub enum HostParseError {
    #[error("empty input")]
    EmptyInput,
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("invalid host line: {0}")]
    InvalidSyntax(String),
}

fn parse_port(value: &serde_yaml::Value) -> Result<u16, HostParseError> {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| HostParseError::InvalidPort(n.to_string())),
        serde_yaml::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| HostParseError::InvalidPort(s.clone())),
        other => Err(HostParseError::InvalidPort(yaml_scalar_to_string(other))),
    }
}

/// Render a scalar YAML value the way it was written
pub(crate) fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Parse INI value (handle booleans and numbers, keep everything else as text)
pub(crate) fn parse_ini_value(value: &str) -> serde_yaml::Value {
    let value = value.trim();

    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" => return serde_yaml::Value::Bool(true),
        "false" | "no" | "off" => return serde_yaml::Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return serde_yaml::Value::Number(n.into());
    }

    serde_yaml::Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_new() {
        let host = Host::new("sw-core-1");
        assert_eq!(host.name, "sw-core-1");
        assert_eq!(host.address(), "sw-core-1");
        assert!(host.port.is_none());
    }

    #[test]
    fn test_host_with_address() {
        let host = Host::with_address("sw-core-1", "10.0.0.101");
        assert_eq!(host.address(), "10.0.0.101");
        assert_eq!(host.to_string(), "sw-core-1 (10.0.0.101)");
    }

    #[test]
    fn test_host_parse() {
        let host = Host::parse("SW-CORE_1 ansible_host=10.0.0.101 ansible_port=2222 site=lab").unwrap();
        assert_eq!(host.name, "SW-CORE_1");
        assert_eq!(host.address(), "10.0.0.101");
        assert_eq!(host.port, Some(2222));
        assert_eq!(
            host.get_var("site"),
            Some(&serde_yaml::Value::String("lab".to_string()))
        );
    }

    #[test]
    fn test_host_parse_quoted_value() {
        let host = Host::parse(r#"r1 ansible_host=10.1.1.1 description="core router""#).unwrap();
        assert_eq!(
            host.get_var("description"),
            Some(&serde_yaml::Value::String("core router".to_string()))
        );
    }

    #[test]
    fn test_host_parse_invalid_port() {
        let err = Host::parse("r1 ansible_port=ssh").unwrap_err();
        assert!(matches!(err, HostParseError::InvalidPort(_)));
    }

    #[test]
    fn test_host_parse_unbalanced_quote() {
        assert!(matches!(
            Host::parse(r#"r1 description="open"#),
            Err(HostParseError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_apply_var_numeric_address() {
        let mut host = Host::new("r1");
        host.apply_var("ansible_port", serde_yaml::Value::Number(830.into()))
            .unwrap();
        assert_eq!(host.port, Some(830));
    }

    #[test]
    fn test_parse_ini_value() {
        assert_eq!(parse_ini_value("yes"), serde_yaml::Value::Bool(true));
        assert_eq!(parse_ini_value("42"), serde_yaml::Value::Number(42.into()));
        assert_eq!(
            parse_ini_value("10.0.0.1"),
            serde_yaml::Value::String("10.0.0.1".to_string())
        );
    }
}
