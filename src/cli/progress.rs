//! Progress tracking for reachability scans.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use o4n::scanner::HostScan;

/// Progress bar advanced once per probed host
pub struct ScanProgress {
    bar: ProgressBar,
    unreachable: AtomicU64,
    hidden: bool,
}

impl ScanProgress {
    /// Create a tracker for `total_hosts`; hidden in JSON mode
    pub fn new(total_hosts: u64, hidden: bool) -> Self {
        let bar = ProgressBar::new(total_hosts);

        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            let style = ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} {prefix:.bold.dim} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hosts {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-");
            bar.set_style(style);
            bar.set_prefix("Probing");
            bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            bar,
            unreachable: AtomicU64::new(0),
            hidden,
        }
    }

    /// Record one finished probe
    pub fn record(&self, scan: &HostScan) {
        self.bar.inc(1);
        if scan.outcome.is_reachable() {
            return;
        }

        let down = self.unreachable.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.hidden {
            self.bar
                .set_message(format!("{} unreachable", down).red().to_string());
        }
    }

    /// Hosts recorded as unreachable so far
    pub fn unreachable(&self) -> u64 {
        self.unreachable.load(Ordering::Relaxed)
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
