//! Inventory loading for o4n.
//!
//! This module provides:
//! - Loading static inventories from INI, YAML and JSON files (or a
//!   directory holding a `hosts` file plus `group_vars`/`host_vars`)
//! - Loading dynamic inventories from the JSON emitted by an external
//!   command (see [`dynamic`])
//! - Host pattern matching for `--limit`
//! - Group hierarchy and variable inheritance
//!
//! Hosts keep their declaration order so that every consumer (scanner,
//! reports, listings) iterates them deterministically.

pub mod dynamic;
pub mod group;
pub mod host;

pub use dynamic::{DynamicInventory, InventoryKind, InventorySource};
pub use group::{Group, GroupHierarchy};
pub use host::{Host, HostParseError};

use host::{parse_ini_value, yaml_scalar_to_string};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inventory not found: {0}")]
    NotFound(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid host pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid INI format: {0}")]
    InvalidIniFormat(String),

    #[error("host '{host}': {source}")]
    HostParse {
        host: String,
        #[source]
        source: HostParseError,
    },
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// The main inventory structure holding all hosts and groups
#[derive(Debug, Clone)]
pub struct Inventory {
    /// All hosts indexed by name, in declaration order
    hosts: IndexMap<String, Host>,

    /// All groups indexed by name
    groups: IndexMap<String, Group>,

    /// Source file/directory path or command
    source: Option<String>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// Create a new empty inventory with default groups
    pub fn new() -> Self {
        let mut inventory = Self {
            hosts: IndexMap::new(),
            groups: IndexMap::new(),
            source: None,
        };

        inventory.groups.insert("all".to_string(), Group::all());
        inventory
            .groups
            .insert("ungrouped".to_string(), Group::ungrouped());

        inventory
    }

    /// Load a static inventory from a file or directory
    pub fn load<P: AsRef<Path>>(path: P) -> InventoryResult<Self> {
        let path = path.as_ref();
        let mut inventory = Self::new();
        inventory.source = Some(path.display().to_string());

        if path.is_file() {
            inventory.load_file(path)?;
        } else if path.is_dir() {
            inventory.load_directory(path)?;
        } else {
            return Err(InventoryError::NotFound(path.display().to_string()));
        }

        inventory.compute_group_parents();
        debug!(
            source = %path.display(),
            hosts = inventory.host_count(),
            groups = inventory.group_count(),
            "loaded static inventory"
        );

        Ok(inventory)
    }

    /// Build an inventory from Ansible `--list` JSON (dynamic inventory output)
    pub fn from_ansible_json(content: &str, source: impl Into<String>) -> InventoryResult<Self> {
        let mut inventory = Self::new();
        inventory.source = Some(source.into());
        inventory.parse_json(content)?;
        inventory.compute_group_parents();
        Ok(inventory)
    }

    /// Source this inventory was loaded from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Load a single inventory file
    fn load_file(&mut self, path: &Path) -> InventoryResult<()> {
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension.to_lowercase().as_str() {
            "yml" | "yaml" => self.parse_yaml(&content)?,
            "json" => self.parse_json(&content)?,
            _ => {
                let trimmed = content.trim_start();
                if trimmed.starts_with('{') {
                    self.parse_json(&content)?;
                } else if content.contains(':') && !content.contains('[') {
                    self.parse_yaml(&content)?;
                } else {
                    self.parse_ini(&content)?;
                }
            }
        }

        Ok(())
    }

    /// Load inventory from a directory
    fn load_directory(&mut self, path: &Path) -> InventoryResult<()> {
        for name in ["hosts", "hosts.yml", "hosts.yaml", "hosts.ini", "hosts.json"] {
            let hosts_file = path.join(name);
            if hosts_file.exists() {
                self.load_file(&hosts_file)?;
                break;
            }
        }

        let group_vars = path.join("group_vars");
        if group_vars.is_dir() {
            for (group_name, vars) in read_vars_dir(&group_vars)? {
                self.groups
                    .entry(group_name.clone())
                    .or_insert_with(|| Group::new(group_name))
                    .vars
                    .extend(vars);
            }
        }

        let host_vars = path.join("host_vars");
        if host_vars.is_dir() {
            for (host_name, vars) in read_vars_dir(&host_vars)? {
                if let Some(host) = self.hosts.get_mut(&host_name) {
                    for (key, value) in vars {
                        host.apply_var(&key, value)
                            .map_err(|source| InventoryError::HostParse {
                                host: host_name.clone(),
                                source,
                            })?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse YAML inventory format
    fn parse_yaml(&mut self, content: &str) -> InventoryResult<()> {
        let data: serde_yaml::Value = serde_yaml::from_str(content)?;

        if let serde_yaml::Value::Mapping(map) = data {
            if let Some(all) = map.get("all") {
                self.parse_yaml_group("all", all)?;
            } else {
                for (key, value) in &map {
                    if let serde_yaml::Value::String(group_name) = key {
                        self.parse_yaml_group(group_name, value)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse a YAML group definition
    fn parse_yaml_group(&mut self, name: &str, value: &serde_yaml::Value) -> InventoryResult<()> {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name));

        let serde_yaml::Value::Mapping(map) = value else {
            return Ok(());
        };

        if let Some(serde_yaml::Value::Mapping(hosts_map)) = map.get("hosts") {
            for (host_key, host_value) in hosts_map {
                let host_name = yaml_scalar_to_string(host_key);
                let mut host = Host::new(host_name.clone());

                if let serde_yaml::Value::Mapping(host_vars) = host_value {
                    for (var_key, var_value) in host_vars {
                        if let serde_yaml::Value::String(key) = var_key {
                            host.apply_var(key, var_value.clone()).map_err(|source| {
                                InventoryError::HostParse {
                                    host: host_name.clone(),
                                    source,
                                }
                            })?;
                        }
                    }
                }

                self.insert_host(host, name);
            }
        }

        if let Some(serde_yaml::Value::Mapping(children_map)) = map.get("children") {
            for (child_key, child_value) in children_map {
                if let serde_yaml::Value::String(child_name) = child_key {
                    if let Some(g) = self.groups.get_mut(name) {
                        g.add_child(child_name.clone());
                    }
                    self.parse_yaml_group(child_name, child_value)?;
                }
            }
        }

        if let Some(serde_yaml::Value::Mapping(vars_map)) = map.get("vars") {
            for (var_key, var_value) in vars_map {
                if let serde_yaml::Value::String(key) = var_key {
                    if let Some(g) = self.groups.get_mut(name) {
                        g.set_var(key.clone(), var_value.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse JSON inventory format (Ansible `--list` output)
    fn parse_json(&mut self, content: &str) -> InventoryResult<()> {
        let data: serde_json::Value = serde_json::from_str(content)?;

        let serde_json::Value::Object(map) = data else {
            return Err(InventoryError::Json(serde::de::Error::custom(
                "inventory JSON must be an object",
            )));
        };

        for (key, value) in &map {
            if key == "_meta" {
                continue;
            }

            self.groups
                .entry(key.clone())
                .or_insert_with(|| Group::new(key));

            let mut hosts_to_add: Vec<String> = Vec::new();

            match value {
                serde_json::Value::Object(group_data) => {
                    if let Some(serde_json::Value::Array(hosts)) = group_data.get("hosts") {
                        hosts_to_add.extend(hosts.iter().filter_map(|h| h.as_str()).map(String::from));
                    }

                    if let Some(serde_json::Value::Array(children)) = group_data.get("children") {
                        for child_name in children.iter().filter_map(|c| c.as_str()) {
                            self.groups
                                .entry(child_name.to_string())
                                .or_insert_with(|| Group::new(child_name));
                            if let Some(group) = self.groups.get_mut(key) {
                                group.add_child(child_name);
                            }
                        }
                    }

                    if let Some(serde_json::Value::Object(vars)) = group_data.get("vars") {
                        if let Some(group) = self.groups.get_mut(key) {
                            for (var_key, var_value) in vars {
                                group.set_var(var_key.clone(), json_to_yaml(var_value));
                            }
                        }
                    }
                }
                serde_json::Value::Array(hosts) => {
                    hosts_to_add.extend(hosts.iter().filter_map(|h| h.as_str()).map(String::from));
                }
                _ => {}
            }

            for host_name in hosts_to_add {
                self.insert_host(Host::new(host_name), key);
            }
        }

        if let Some(hostvars) = map
            .get("_meta")
            .and_then(|meta| meta.get("hostvars"))
            .and_then(|hv| hv.as_object())
        {
            for (host_name, vars) in hostvars {
                if !self.hosts.contains_key(host_name) {
                    self.insert_host(Host::new(host_name.clone()), "ungrouped");
                }

                let Some(vars_map) = vars.as_object() else {
                    continue;
                };
                if let Some(host) = self.hosts.get_mut(host_name) {
                    for (var_key, var_value) in vars_map {
                        host.apply_var(var_key, json_to_yaml(var_value))
                            .map_err(|source| InventoryError::HostParse {
                                host: host_name.clone(),
                                source,
                            })?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse INI inventory format
    fn parse_ini(&mut self, content: &str) -> InventoryResult<()> {
        let mut current_group = "ungrouped".to_string();
        let mut is_vars_section = false;
        let mut is_children_section = false;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(InventoryError::InvalidIniFormat(format!(
                        "line {}: unterminated section header '{}'",
                        lineno + 1,
                        line
                    )));
                }
                let section = &line[1..line.len() - 1];

                if let Some((group_name, suffix)) = section.rsplit_once(':') {
                    current_group = group_name.to_string();
                    is_vars_section = suffix == "vars";
                    is_children_section = suffix == "children";
                } else {
                    current_group = section.to_string();
                    is_vars_section = false;
                    is_children_section = false;
                }

                self.groups
                    .entry(current_group.clone())
                    .or_insert_with(|| Group::new(&current_group));

                continue;
            }

            if is_vars_section {
                if let Some((key, value)) = line.split_once('=') {
                    if let Some(group) = self.groups.get_mut(&current_group) {
                        group.set_var(key.trim(), parse_ini_value(value));
                    }
                }
            } else if is_children_section {
                if let Some(group) = self.groups.get_mut(&current_group) {
                    group.add_child(line);
                }
                self.groups
                    .entry(line.to_string())
                    .or_insert_with(|| Group::new(line));
            } else {
                let host = Host::parse(line).map_err(|source| InventoryError::HostParse {
                    host: line.split_whitespace().next().unwrap_or_default().to_string(),
                    source,
                })?;
                self.insert_host(host, &current_group);
            }
        }

        Ok(())
    }

    /// Insert a host under a group, merging with an earlier declaration
    fn insert_host(&mut self, host: Host, group_name: &str) {
        let host_name = host.name.clone();

        if let Some(group) = self.groups.get_mut(group_name) {
            group.add_host(host_name.clone());
        }
        if group_name != "all" {
            if let Some(all_group) = self.groups.get_mut("all") {
                all_group.add_host(host_name.clone());
            }
        }

        if let Some(existing) = self.hosts.get_mut(&host_name) {
            existing.add_to_group(group_name);
            existing.merge_vars(&host.vars);
            if host.ansible_host.is_some() {
                existing.ansible_host = host.ansible_host;
            }
            if host.port.is_some() {
                existing.port = host.port;
            }
        } else {
            let mut new_host = host;
            new_host.add_to_group(group_name);
            new_host.add_to_group("all");
            self.hosts.insert(host_name, new_host);
        }
    }

    /// Compute parent group relationships from children
    fn compute_group_parents(&mut self) {
        let edges: Vec<(String, String)> = self
            .groups
            .values()
            .flat_map(|g| g.children.iter().map(move |c| (g.name.clone(), c.clone())))
            .collect();

        for (parent_name, child_name) in edges {
            if let Some(child) = self.groups.get_mut(&child_name) {
                child.add_parent(parent_name);
            }
        }
    }

    /// Add a host to the inventory under the groups it already names,
    /// or `ungrouped` when it names none
    pub fn add_host(&mut self, host: Host) {
        let groups: Vec<String> = host
            .groups
            .iter()
            .filter(|g| *g != "all")
            .cloned()
            .collect();

        if groups.is_empty() {
            self.insert_host(host, "ungrouped");
            return;
        }

        for group_name in &groups {
            self.groups
                .entry(group_name.clone())
                .or_insert_with(|| Group::new(group_name.clone()));
        }
        let mut groups = groups.into_iter();
        if let Some(first) = groups.next() {
            let name = host.name.clone();
            self.insert_host(host, &first);
            for group_name in groups {
                self.insert_host(Host::new(name.clone()), &group_name);
            }
        }
    }

    /// Add a group to the inventory
    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.name.clone(), group);
        self.compute_group_parents();
    }

    pub fn get_host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// All hosts, in declaration order
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get hosts matching a pattern, in declaration order
    ///
    /// Supported patterns:
    /// - `all` - all hosts
    /// - `hostname` - specific host
    /// - `groupname` - all hosts in group
    /// - `host1:host2` - multiple hosts/groups (union)
    /// - `group1:&group2` - intersection
    /// - `group1:!group2` - exclusion
    /// - `~regex` - regex match on hostname
    /// - `*` - wildcard match
    pub fn get_hosts_for_pattern(&self, pattern: &str) -> InventoryResult<Vec<&Host>> {
        let names = self.match_pattern(pattern)?;
        Ok(self
            .hosts
            .values()
            .filter(|h| names.contains(h.name.as_str()))
            .collect())
    }

    fn match_pattern(&self, pattern: &str) -> InventoryResult<HashSet<&str>> {
        let pattern = pattern.trim();

        if pattern.is_empty() {
            return Ok(HashSet::new());
        }

        if pattern == "all" || pattern == "*" {
            return Ok(self.hosts.keys().map(String::as_str).collect());
        }

        if pattern.contains(':') {
            return self.match_complex_pattern(pattern);
        }

        if let Some(regex_str) = pattern.strip_prefix('~') {
            let regex = Regex::new(regex_str)
                .map_err(|_| InventoryError::InvalidPattern(pattern.to_string()))?;
            return Ok(self
                .hosts
                .keys()
                .filter(|name| regex.is_match(name))
                .map(String::as_str)
                .collect());
        }

        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let regex = Regex::new(&glob_to_regex(pattern))
                .map_err(|_| InventoryError::InvalidPattern(pattern.to_string()))?;
            return Ok(self
                .hosts
                .keys()
                .filter(|name| regex.is_match(name))
                .map(String::as_str)
                .collect());
        }

        if let Some(group) = self.groups.get(pattern) {
            let mut visited = HashSet::new();
            return Ok(self.hosts_in_group_recursive(group, &mut visited));
        }

        if let Some((name, _)) = self.hosts.get_key_value(pattern) {
            return Ok(HashSet::from([name.as_str()]));
        }

        Err(InventoryError::InvalidPattern(format!(
            "no hosts matched pattern: {}",
            pattern
        )))
    }

    fn match_complex_pattern(&self, pattern: &str) -> InventoryResult<HashSet<&str>> {
        let mut result: HashSet<&str> = HashSet::new();

        for part in split_pattern(pattern) {
            let part = part.trim();

            if let Some(sub_pattern) = part.strip_prefix('&') {
                let sub_set = self.match_pattern(sub_pattern)?;
                result = result.intersection(&sub_set).copied().collect();
            } else if let Some(sub_pattern) = part.strip_prefix('!') {
                for name in self.match_pattern(sub_pattern)? {
                    result.remove(name);
                }
            } else if !part.is_empty() {
                result.extend(self.match_pattern(part)?);
            }
        }

        Ok(result)
    }

    /// All hosts in a group, including hosts from child groups
    fn hosts_in_group_recursive<'a>(
        &'a self,
        group: &'a Group,
        visited: &mut HashSet<&'a str>,
    ) -> HashSet<&'a str> {
        let mut hosts: HashSet<&str> = group.hosts.iter().map(String::as_str).collect();
        if !visited.insert(group.name.as_str()) {
            return hosts;
        }

        for child_name in &group.children {
            if let Some(child) = self.groups.get(child_name) {
                hosts.extend(self.hosts_in_group_recursive(child, visited));
            }
        }

        hosts
    }

    /// Group hierarchy for a host (from most specific to least specific)
    pub fn get_host_group_hierarchy(&self, host: &Host) -> GroupHierarchy {
        fn collect_parents(
            inventory: &Inventory,
            group_name: &str,
            hierarchy: &mut GroupHierarchy,
            visited: &mut HashSet<String>,
        ) {
            if !visited.insert(group_name.to_string()) {
                return;
            }
            hierarchy.push(group_name);

            if let Some(group) = inventory.groups.get(group_name) {
                for parent in &group.parents {
                    collect_parents(inventory, parent, hierarchy, visited);
                }
            }
        }

        let mut hierarchy = GroupHierarchy::new();
        let mut visited = HashSet::new();

        for group_name in host.groups.iter().filter(|g| *g != "all") {
            collect_parents(self, group_name, &mut hierarchy, &mut visited);
        }
        collect_parents(self, "all", &mut hierarchy, &mut visited);

        hierarchy
    }

    /// Merged variables for a host (group vars parent to child, then host vars)
    pub fn get_host_vars(&self, host: &Host) -> IndexMap<String, serde_yaml::Value> {
        let mut vars = IndexMap::new();

        for group_name in self.get_host_group_hierarchy(host).parent_to_child() {
            if let Some(group) = self.groups.get(group_name) {
                vars.extend(group.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        vars.extend(host.vars.iter().map(|(k, v)| (k.clone(), v.clone())));

        vars
    }

    /// Address to probe for a host: `ansible_host` from the host, then from
    /// its groups, then the host name.
    pub fn host_address(&self, host: &Host) -> String {
        if let Some(address) = &host.ansible_host {
            return address.clone();
        }
        self.get_host_vars(host)
            .get("ansible_host")
            .map(yaml_scalar_to_string)
            .unwrap_or_else(|| host.name.clone())
    }

    /// Port declared for a host, either directly or through group vars
    pub fn host_port(&self, host: &Host) -> Option<u16> {
        host.port.or_else(|| {
            self.get_host_vars(host)
                .get("ansible_port")
                .and_then(|v| yaml_scalar_to_string(v).parse().ok())
        })
    }
}

/// Read `<name>.yml` files from a `group_vars`/`host_vars` directory
fn read_vars_dir(path: &Path) -> InventoryResult<Vec<(String, IndexMap<String, serde_yaml::Value>)>> {
    let mut entries: Vec<_> = std::fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.path());

    let mut out = Vec::new();
    for entry in entries {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        let Some(name) = file_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&file_path)?;
        let vars: Option<IndexMap<String, serde_yaml::Value>> = serde_yaml::from_str(&content)?;
        out.push((name.to_string(), vars.unwrap_or_default()));
    }

    Ok(out)
}

/// Split pattern by : but not inside brackets
fn split_pattern(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut bracket_depth: usize = 0;

    for (i, ch) in pattern.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            ':' if bracket_depth == 0 => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&pattern[start..]);
    parts
}

/// Convert a glob pattern to regex
fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");

    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '.' | '+' | '(' | ')' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            _ => regex.push(ch),
        }
    }

    regex.push('$');
    regex
}

/// Convert JSON value to YAML value
fn json_to_yaml(value: &serde_json::Value) -> serde_yaml::Value {
    match value {
        serde_json::Value::Null => serde_yaml::Value::Null,
        serde_json::Value::Bool(b) => serde_yaml::Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                serde_yaml::Value::Number(u.into())
            } else {
                serde_yaml::Value::Number(n.as_f64().unwrap_or_default().into())
            }
        }
        serde_json::Value::String(s) => serde_yaml::Value::String(s.clone()),
        serde_json::Value::Array(arr) => {
            serde_yaml::Value::Sequence(arr.iter().map(json_to_yaml).collect())
        }
        serde_json::Value::Object(obj) => {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in obj {
                map.insert(serde_yaml::Value::String(k.clone()), json_to_yaml(v));
            }
            serde_yaml::Value::Mapping(map)
        }
    }
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Inventory ({} hosts, {} groups)",
            self.hosts.len(),
            self.groups.len()
        )?;

        for group in self.groups.values() {
            if group.hosts.is_empty() && group.children.is_empty() {
                continue;
            }
            writeln!(f, "  [{}]", group.name)?;
            for host_name in &group.hosts {
                if let Some(host) = self.hosts.get(host_name) {
                    writeln!(f, "    {}", host)?;
                }
            }
        }

        Ok(())
    }
}
