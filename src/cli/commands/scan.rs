//! Unreachable command - probe inventory hosts and report failures
//!
//! This module implements the `unreachable` subcommand.

use super::{CommandContext, Runnable};
use crate::cli::progress::ScanProgress;
use anyhow::{Context, Result};
use clap::Parser;
use o4n::scanner::{ScanConfig, ScanReport, Scanner, UnreachableReport};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Exit code when `--fail-on-unreachable` is set and a host is down
pub const EXIT_UNREACHABLE: i32 = 2;

/// Arguments for the unreachable command
#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// Limit the scan to hosts matching this pattern
    #[arg(short = 'l', long, default_value = "all")]
    pub limit: String,

    /// Port probed on every host, overriding ansible_port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Connect timeout in seconds
    #[arg(short = 't', long)]
    pub timeout: Option<f64>,

    /// Number of concurrent probes
    #[arg(short = 'f', long)]
    pub forks: Option<usize>,

    /// Extra attempts before a host counts as unreachable
    #[arg(long)]
    pub retries: Option<u32>,

    /// Where to write the unreachable hosts report
    #[arg(long = "json-output")]
    pub json_output: Option<PathBuf>,

    /// Do not write the report file
    #[arg(long)]
    pub no_write: bool,

    /// Exit with status 2 when any host is unreachable
    #[arg(long)]
    pub fail_on_unreachable: bool,
}

/// Machine-readable result of a scan
#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub failed: bool,
    pub msg: String,
    pub content: UnreachableReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl ScanArgs {
    /// Merge command-line overrides with configuration
    pub fn scan_config(&self, ctx: &CommandContext) -> Result<ScanConfig> {
        let settings = &ctx.config.scan;
        let timeout = self.timeout.unwrap_or(settings.timeout);
        if timeout <= 0.0 {
            anyhow::bail!("timeout must be a positive number of seconds, got {}", timeout);
        }
        let Ok(timeout) = Duration::try_from_secs_f64(timeout) else {
            anyhow::bail!("timeout of {} seconds is out of range", timeout);
        };

        Ok(ScanConfig {
            default_port: settings.port,
            port_override: self.port,
            timeout,
            forks: self.forks.unwrap_or(settings.forks),
            retries: self.retries.unwrap_or(settings.retries),
        })
    }

    fn report_path(&self, ctx: &CommandContext) -> PathBuf {
        self.json_output
            .clone()
            .unwrap_or_else(|| ctx.config.scan.json_output.clone())
    }

    /// Execute the unreachable command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let scan_config = self.scan_config(ctx)?;
        let inventory = ctx.load_inventory().await?;
        let hosts = inventory.get_hosts_for_pattern(&self.limit)?;

        ctx.output.banner("UNREACHABLE HOSTS");
        if hosts.is_empty() {
            ctx.output
                .warning(&format!("No hosts matched pattern: {}", self.limit));
        }

        let scanner = Scanner::tcp(scan_config);
        let progress = ScanProgress::new(hosts.len() as u64, ctx.output.is_json());
        let report = scanner
            .scan_with_progress(&inventory, &hosts, |scan| progress.record(scan))
            .await?;
        progress.finish();
        debug!(
            unreachable = progress.unreachable(),
            elapsed = report.duration.as_secs_f64(),
            "scan finished"
        );

        for scan in &report.scans {
            ctx.output.scan_result(scan);
        }

        let unreachable = report.unreachable_report();
        let report_path = if self.no_write {
            None
        } else {
            let path = self.report_path(ctx);
            unreachable.write_to(&path)?;
            Some(path)
        };

        self.print_summary(ctx, &report, unreachable, report_path)
            .context("failed to print scan summary")?;

        if self.fail_on_unreachable && report.has_unreachable() {
            return Ok(EXIT_UNREACHABLE);
        }
        Ok(0)
    }

    fn print_summary(
        &self,
        ctx: &CommandContext,
        report: &ScanReport,
        unreachable: UnreachableReport,
        report_path: Option<PathBuf>,
    ) -> Result<()> {
        let msg = if unreachable.is_empty() {
            "no hosts with connection problems".to_string()
        } else {
            format!("{} host(s) with connection problems", unreachable.len())
        };

        if ctx.output.is_json() {
            ctx.output.json(&ScanResult {
                failed: false,
                msg,
                content: unreachable,
                report_path,
            });
            return Ok(());
        }

        ctx.output.scan_recap(report);
        match report_path {
            Some(path) => ctx
                .output
                .hint(&format!("{} (report: {})", msg, path.display())),
            None => ctx.output.hint(&msg),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for ScanArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use o4n::config::Config;

    fn parse(args: &[&str]) -> (ScanArgs, CommandContext) {
        let cli = Cli::try_parse_from(args).unwrap();
        let ctx = CommandContext::new(&cli, Config::default());
        match cli.command {
            Commands::Unreachable(scan) => (scan, ctx),
            _ => panic!("expected unreachable command"),
        }
    }

    #[test]
    fn test_scan_config_uses_config_defaults() {
        let (args, ctx) = parse(&["o4n", "unreachable"]);
        let config = args.scan_config(&ctx).unwrap();

        assert_eq!(config.default_port, 22);
        assert_eq!(config.port_override, None);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.forks, 5);
    }

    #[test]
    fn test_scan_config_flags_win() {
        let (args, ctx) = parse(&[
            "o4n",
            "unreachable",
            "--port",
            "830",
            "--timeout",
            "0.5",
            "-f",
            "20",
            "--retries",
            "2",
        ]);
        let config = args.scan_config(&ctx).unwrap();

        assert_eq!(config.port_override, Some(830));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.forks, 20);
        assert_eq!(config.retries, 2);
    }

    #[test]
    fn test_scan_config_rejects_bad_timeout() {
        let (args, ctx) = parse(&["o4n", "unreachable", "--timeout", "0"]);
        assert!(args.scan_config(&ctx).is_err());

        let (args, ctx) = parse(&["o4n", "unreachable", "--timeout", "1e20"]);
        assert!(args.scan_config(&ctx).is_err());

        let (args, ctx) = parse(&["o4n", "unreachable", "--timeout", "NaN"]);
        assert!(args.scan_config(&ctx).is_err());
    }

    #[test]
    fn test_report_path_default() {
        let (args, ctx) = parse(&["o4n", "unreachable"]);
        assert_eq!(args.report_path(&ctx), PathBuf::from("unavailable_hosts.json"));

        let (args, ctx) = parse(&["o4n", "unreachable", "--json-output", "out/down.json"]);
        assert_eq!(args.report_path(&ctx), PathBuf::from("out/down.json"));
    }
}
