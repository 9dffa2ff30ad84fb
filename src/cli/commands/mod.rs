//! Subcommands module for the o4n CLI
//!
//! This module contains all the subcommand implementations.

pub mod inventory;
pub mod render;
pub mod scan;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use o4n::config::Config;
use o4n::inventory::{DynamicInventory, Inventory, InventoryKind, InventorySource};
use std::path::PathBuf;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Inventory path
    pub inventory_path: Option<PathBuf>,
    /// Inventory kind chosen on the command line
    pub inventory_type: Option<InventoryKind>,
    /// Extra variables
    pub extra_vars: Vec<String>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            inventory_path: cli.inventory.clone(),
            inventory_type: cli.inventory_type.map(Into::into),
            extra_vars: cli.extra_vars.clone(),
        }
    }

    /// Get the effective inventory path
    pub fn inventory(&self) -> Option<&PathBuf> {
        self.inventory_path
            .as_ref()
            .or(self.config.defaults.inventory.as_ref())
    }

    /// Resolve the inventory source from flags and configuration
    pub fn inventory_source(&self) -> Result<InventorySource> {
        let path = self.inventory().cloned().context(
            "no inventory given; pass -i/--inventory or set defaults.inventory in o4n.toml",
        )?;
        let kind = self
            .inventory_type
            .unwrap_or(self.config.defaults.inventory_type);
        Ok(InventorySource::new(kind, path))
    }

    /// Load the inventory, running the dynamic command when asked to
    pub async fn load_inventory(&self) -> Result<Inventory> {
        let source = self.inventory_source()?;
        let dynamic = DynamicInventory::new(self.config.dynamic.command.clone());
        self.output.info(&format!("Loading inventory from {}", source));
        Ok(source.load(&dynamic).await?)
    }

    /// Parse extra variables into an ordered map
    pub fn parse_extra_vars(&self) -> Result<IndexMap<String, serde_json::Value>> {
        let mut vars = IndexMap::new();

        for var in &self.extra_vars {
            if let Some(file_path) = var.strip_prefix('@') {
                let content = std::fs::read_to_string(file_path)
                    .with_context(|| format!("failed to read extra vars file '{}'", file_path))?;
                let file_vars: IndexMap<String, serde_json::Value> =
                    serde_yaml::from_str(&content)
                        .with_context(|| format!("invalid extra vars file '{}'", file_path))?;
                vars.extend(file_vars);
            } else if let Some((key, value)) = var.split_once('=') {
                let parsed_value: serde_json::Value = serde_yaml::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
                // an empty value parses as YAML null
                let parsed_value = if parsed_value.is_null() && !value.trim().is_empty() {
                    serde_json::Value::String(value.to_string())
                } else {
                    parsed_value
                };
                vars.insert(key.to_string(), parsed_value);
            } else {
                anyhow::bail!("invalid extra variable '{}', expected key=value or @file", var);
            }
        }

        Ok(vars)
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
