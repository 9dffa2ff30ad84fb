//! TCP reachability probes.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Result of probing a single host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// A connection was established within the threshold
    Reachable {
        /// Connect time in seconds
        response_time: f64,
    },
    /// No usable connection
    Unreachable {
        /// Connect time in seconds when a connection was made but was too slow
        response_time: Option<f64>,
        /// Why the host counts as unreachable
        reason: String,
    },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable { .. })
    }

    pub fn response_time(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Reachable { response_time } => Some(*response_time),
            ProbeOutcome::Unreachable { response_time, .. } => *response_time,
        }
    }
}

/// Something that can tell whether `address:port` accepts connections
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &str, port: u16) -> ProbeOutcome;
}

/// Probes hosts with a plain TCP connect
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
    retries: u32,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            retries: 0,
        }
    }

    /// Extra attempts made before a host is declared unreachable
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    async fn attempt(&self, address: &str, port: u16) -> ProbeOutcome {
        let target = socket_target(address, port);
        let started = Instant::now();

        match timeout(self.timeout, TcpStream::connect(&target)).await {
            Ok(Ok(_stream)) => classify_connect(started.elapsed(), self.timeout),
            Ok(Err(e)) => ProbeOutcome::Unreachable {
                response_time: None,
                reason: e.to_string(),
            },
            Err(_elapsed) => ProbeOutcome::Unreachable {
                response_time: None,
                reason: format!("timed out after {:.3}s", self.timeout.as_secs_f64()),
            },
        }
    }
}

/// Outcome of a connect that succeeded after `elapsed`; slower than
/// `threshold` still counts as unreachable
fn classify_connect(elapsed: Duration, threshold: Duration) -> ProbeOutcome {
    let response_time = elapsed.as_secs_f64();
    if elapsed > threshold {
        ProbeOutcome::Unreachable {
            response_time: Some(response_time),
            reason: format!(
                "response time {:.3}s exceeds {:.3}s",
                response_time,
                threshold.as_secs_f64()
            ),
        }
    } else {
        ProbeOutcome::Reachable { response_time }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &str, port: u16) -> ProbeOutcome {
        let mut outcome = self.attempt(address, port).await;
        let mut attempt = 0;

        while !outcome.is_reachable() && attempt < self.retries {
            attempt += 1;
            trace!(address, port, attempt, "retrying probe");
            outcome = self.attempt(address, port).await;
        }

        outcome
    }
}

/// `host:port`, bracketing bare IPv6 literals
fn socket_target(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}
