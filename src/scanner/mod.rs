//! Host reachability scanning.
//!
//! The scanner resolves every selected inventory host to an address and a
//! port, probes them with a bounded number of concurrent connects and
//! returns the outcomes in inventory order.

pub mod probe;
pub mod report;

pub use probe::{ProbeOutcome, Prober, TcpProber};
pub use report::{ReportEntry, UnreachableReport, DEFAULT_REPORT_PATH};

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::inventory::{Host, Inventory};

/// Default management port
pub const DEFAULT_PORT: u16 = 22;
/// Default connect timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
/// Default number of concurrent probes
pub const DEFAULT_FORKS: usize = 5;

/// Scan settings
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Port used when neither the command line nor the host names one
    pub default_port: u16,
    /// Port forced for every host
    pub port_override: Option<u16>,
    /// Connect timeout, also the slow-response threshold
    pub timeout: Duration,
    /// Maximum probes in flight
    pub forks: usize,
    /// Extra attempts before a host is unreachable
    pub retries: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            port_override: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            forks: DEFAULT_FORKS,
            retries: 0,
        }
    }
}

impl ScanConfig {
    /// Port to probe for a host
    pub fn port_for(&self, inventory: &Inventory, host: &Host) -> u16 {
        self.port_override
            .or_else(|| inventory.host_port(host))
            .unwrap_or(self.default_port)
    }
}

/// Outcome for one host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostScan {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub outcome: ProbeOutcome,
}

/// Outcomes of a whole scan, in inventory order
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scans: Vec<HostScan>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl ScanReport {
    pub fn total(&self) -> usize {
        self.scans.len()
    }

    pub fn reachable(&self) -> impl Iterator<Item = &HostScan> {
        self.scans.iter().filter(|s| s.outcome.is_reachable())
    }

    pub fn unreachable(&self) -> impl Iterator<Item = &HostScan> {
        self.scans.iter().filter(|s| !s.outcome.is_reachable())
    }

    pub fn has_unreachable(&self) -> bool {
        self.unreachable().next().is_some()
    }

    pub fn unreachable_report(&self) -> UnreachableReport {
        UnreachableReport::from_scans(&self.scans)
    }
}

/// Probes inventory hosts concurrently
pub struct Scanner<P> {
    prober: P,
    config: ScanConfig,
}

impl Scanner<TcpProber> {
    /// Scanner using TCP connects configured from `config`
    pub fn tcp(config: ScanConfig) -> Self {
        let prober = TcpProber::new(config.timeout).with_retries(config.retries);
        Self::new(prober, config)
    }
}

impl<P: Prober> Scanner<P> {
    pub fn new(prober: P, config: ScanConfig) -> Self {
        Self { prober, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Probe `hosts` and return their outcomes in the order given
    pub async fn scan(&self, inventory: &Inventory, hosts: &[&Host]) -> Result<ScanReport> {
        self.scan_with_progress(inventory, hosts, |_| {}).await
    }

    /// Like [`Scanner::scan`], calling `on_result` as each probe completes
    pub async fn scan_with_progress<F>(
        &self,
        inventory: &Inventory,
        hosts: &[&Host],
        on_result: F,
    ) -> Result<ScanReport>
    where
        F: Fn(&HostScan),
    {
        if self.config.forks == 0 {
            return Err(Error::ScanAborted("forks must be at least 1".into()));
        }

        let started = Instant::now();
        let targets: Vec<(usize, String, String, u16)> = hosts
            .iter()
            .enumerate()
            .map(|(idx, host)| {
                (
                    idx,
                    host.name.clone(),
                    inventory.host_address(host),
                    self.config.port_for(inventory, host),
                )
            })
            .collect();

        info!(
            hosts = targets.len(),
            forks = self.config.forks,
            timeout = self.config.timeout.as_secs_f64(),
            "starting reachability scan"
        );

        let prober = &self.prober;
        let mut results: Vec<(usize, HostScan)> = stream::iter(targets)
            .map(move |(idx, name, address, port)| async move {
                let outcome = prober.probe(&address, port).await;
                (
                    idx,
                    HostScan {
                        name,
                        address,
                        port,
                        outcome,
                    },
                )
            })
            .buffer_unordered(self.config.forks)
            .inspect(|(_, scan)| {
                match &scan.outcome {
                    ProbeOutcome::Reachable { response_time } => {
                        debug!(host = %scan.name, response_time, "reachable");
                    }
                    ProbeOutcome::Unreachable { reason, .. } => {
                        warn!(host = %scan.name, address = %scan.address, port = scan.port, %reason, "unreachable");
                    }
                }
                on_result(scan);
            })
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        let report = ScanReport {
            scans: results.into_iter().map(|(_, scan)| scan).collect(),
            duration: started.elapsed(),
        };

        info!(
            total = report.total(),
            unreachable = report.unreachable().count(),
            "scan finished"
        );
        Ok(report)
    }
}
