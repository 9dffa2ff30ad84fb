//! Inventory commands - list the hosts a scan would probe
//!
//! This module implements the `list-hosts` subcommand.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use indexmap::IndexMap;
use o4n::inventory::{Host, Inventory};
use serde::Serialize;

/// Arguments for list-hosts command
#[derive(Parser, Debug, Clone)]
pub struct ListHostsArgs {
    /// Host pattern to match
    #[arg(default_value = "all")]
    pub pattern: String,

    /// Show host variables
    #[arg(long)]
    pub vars: bool,

    /// Group by groups instead of flat list
    #[arg(long)]
    pub graph: bool,
}

/// Resolved view of a host
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub vars: IndexMap<String, serde_yaml::Value>,
}

impl HostInfo {
    fn resolve(inventory: &Inventory, host: &Host, with_vars: bool) -> Self {
        Self {
            name: host.name.clone(),
            address: inventory.host_address(host),
            port: inventory.host_port(host),
            groups: host
                .groups
                .iter()
                .filter(|g| *g != "all")
                .cloned()
                .collect(),
            vars: if with_vars {
                inventory.get_host_vars(host)
            } else {
                IndexMap::new()
            },
        }
    }
}

/// Hosts bucketed under each group they belong to, in first-seen order
fn group_graph(hosts: &[HostInfo]) -> IndexMap<String, Vec<String>> {
    let mut graph: IndexMap<String, Vec<String>> = IndexMap::new();
    for host in hosts {
        for group in &host.groups {
            graph
                .entry(group.clone())
                .or_default()
                .push(host.name.clone());
        }
    }
    graph
}

impl ListHostsArgs {
    /// Execute the list-hosts command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = ctx.load_inventory().await?;
        let hosts: Vec<HostInfo> = inventory
            .get_hosts_for_pattern(&self.pattern)?
            .into_iter()
            .map(|h| HostInfo::resolve(&inventory, h, self.vars))
            .collect();

        if ctx.output.is_json() {
            if self.graph {
                ctx.output.json(&group_graph(&hosts));
            } else {
                ctx.output.json(&hosts);
            }
            return Ok(0);
        }

        if hosts.is_empty() {
            ctx.output
                .warning(&format!("No hosts matched pattern: {}", self.pattern));
            return Ok(0);
        }

        if self.graph {
            ctx.output
                .section(&format!("Hosts matching pattern: {}", self.pattern));
            for (group, members) in group_graph(&hosts) {
                ctx.output.list(&format!("@{}", group), &members);
            }
            return Ok(0);
        }

        ctx.output.section(&format!("Hosts ({})", hosts.len()));
        let rows: Vec<Vec<String>> = hosts
            .iter()
            .map(|h| {
                vec![
                    h.name.clone(),
                    h.address.clone(),
                    h.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                    h.groups.join(","),
                ]
            })
            .collect();
        ctx.output.table(&["HOST", "ADDRESS", "PORT", "GROUPS"], &rows);

        if self.vars {
            for host in hosts.iter().filter(|h| !h.vars.is_empty()) {
                ctx.output.plain(&format!("\n{}:", host.name));
                for (key, value) in &host.vars {
                    ctx.output
                        .plain(&format!("  {}: {}", key, serde_yaml::to_string(value)?.trim()));
                }
            }
        }

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for ListHostsArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
