//! Inventory groups.
//!
//! A group is a named set of hosts with shared variables and parent-child
//! relationships, as declared by `[group]`, `[group:children]` and
//! `[group:vars]` sections (or their YAML/JSON equivalents).

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A group of hosts in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,

    /// Host names belonging to this group, in declaration order
    #[serde(default)]
    pub hosts: IndexSet<String>,

    /// Child group names
    #[serde(default)]
    pub children: IndexSet<String>,

    /// Parent group names (computed from children relationships)
    #[serde(skip)]
    pub parents: IndexSet<String>,

    /// Group-specific variables
    #[serde(default)]
    pub vars: IndexMap<String, serde_yaml::Value>,
}

impl Group {
    /// Create a new group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: IndexSet::new(),
            children: IndexSet::new(),
            parents: IndexSet::new(),
            vars: IndexMap::new(),
        }
    }

    /// Create the special "all" group
    pub fn all() -> Self {
        Self::new("all")
    }

    /// Create the special "ungrouped" group
    pub fn ungrouped() -> Self {
        Self::new("ungrouped")
    }

    pub fn add_host(&mut self, host: impl Into<String>) {
        self.hosts.insert(host.into());
    }

    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    pub fn add_child(&mut self, child: impl Into<String>) {
        self.children.insert(child.into());
    }

    pub fn has_child(&self, child: &str) -> bool {
        self.children.contains(child)
    }

    /// Add a parent group (internal use for reverse lookups)
    pub fn add_parent(&mut self, parent: impl Into<String>) {
        self.parents.insert(parent.into());
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.vars.insert(key.into(), value);
    }

    pub fn get_var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }

    pub fn has_var(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Check if this group is empty (no hosts and no children)
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.children.is_empty()
    }

    /// Number of direct host members
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Group {}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} hosts", self.name, self.hosts.len())?;
        if !self.children.is_empty() {
            write!(f, ", {} children", self.children.len())?;
        }
        write!(f, ")")
    }
}

/// Group hierarchy of a host, used for variable inheritance
#[derive(Debug, Clone, Default)]
pub struct GroupHierarchy {
    /// Groups from most specific to least specific (child to parent)
    pub groups: Vec<String>,
}

impl GroupHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: impl Into<String>) {
        self.groups.push(group.into());
    }

    /// Groups from least specific to most specific (parent to child).
    /// Variables applied in this order let children override parents.
    pub fn parent_to_child(&self) -> impl Iterator<Item = &String> {
        self.groups.iter().rev()
    }
}
