//! CLI module for o4n
//!
//! This module provides the command-line interface for o4n,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod completions;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// o4n - host reachability scanning and device config rendering
#[derive(Parser, Debug, Clone)]
#[command(name = "o4n")]
#[command(version)]
#[command(about = "Host reachability scanner and device config renderer", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to inventory file, directory or dynamic source
    #[arg(short = 'i', long, global = true)]
    pub inventory: Option<PathBuf>,

    /// How the inventory is resolved
    #[arg(long = "inventory-type", global = true, value_enum)]
    pub inventory_type: Option<InventoryTypeArg>,

    /// Extra variables (key=value or @file.yml)
    #[arg(
        short = 'e',
        long = "extra-vars",
        visible_alias = "var",
        global = true,
        action = clap::ArgAction::Append
    )]
    pub extra_vars: Vec<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Inventory resolution selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InventoryTypeArg {
    /// Read the inventory file directly
    Static,
    /// Run the dynamic inventory command
    Dynamic,
}

impl From<InventoryTypeArg> for o4n::inventory::InventoryKind {
    fn from(arg: InventoryTypeArg) -> Self {
        match arg {
            InventoryTypeArg::Static => Self::Static,
            InventoryTypeArg::Dynamic => Self::Dynamic,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Probe inventory hosts and report the unreachable ones
    Unreachable(commands::scan::ScanArgs),

    /// Render device configuration from existing config and templates
    Render(commands::render::RenderArgs),

    /// List hosts in inventory
    #[command(name = "list-hosts")]
    ListHosts(commands::inventory::ListHostsArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

/// Arguments for completions command
#[derive(Parser, Debug, Clone)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Print installation instructions instead of the script
    #[arg(long)]
    pub instructions: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["o4n", "unreachable", "-i", "hosts.ini"]).unwrap();
        assert!(matches!(cli.command, Commands::Unreachable(_)));
        assert_eq!(cli.inventory, Some(PathBuf::from("hosts.ini")));
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["o4n", "-vvvv", "list-hosts"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_extra_vars_and_alias() {
        let cli = Cli::try_parse_from([
            "o4n",
            "render",
            "--config",
            "hostname r1",
            "--template",
            "hostname {{ h }}",
            "-e",
            "site=bog",
            "--var",
            "region=co",
        ])
        .unwrap();
        assert_eq!(cli.extra_vars, vec!["site=bog", "region=co"]);
    }

    #[test]
    fn test_render_config_and_config_file_are_distinct() {
        let cli = Cli::try_parse_from([
            "o4n",
            "-c",
            "site.toml",
            "render",
            "--config",
            "interface Vlan1",
            "--template",
            "interface {{ ifname }}",
        ])
        .unwrap();
        assert_eq!(cli.config_file, Some(PathBuf::from("site.toml")));
        match cli.command {
            Commands::Render(args) => assert_eq!(args.config.as_deref(), Some("interface Vlan1")),
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_inventory_type() {
        let cli = Cli::try_parse_from([
            "o4n",
            "unreachable",
            "--inventory-type",
            "dynamic",
            "-i",
            "fedele.yml",
        ])
        .unwrap();
        assert_eq!(cli.inventory_type, Some(InventoryTypeArg::Dynamic));
    }

    #[test]
    fn test_completions_args() {
        let cli = Cli::try_parse_from(["o4n", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Commands::Completions(ref a) if a.shell == Shell::Bash));
    }
}
