//! Output formatting module for o4n
//!
//! Provides colored output and JSON output for scripting.

use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

use o4n::scanner::{HostScan, ProbeOutcome, ScanReport};

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print one probe result line
    pub fn scan_result(&self, scan: &HostScan) {
        if self.json_mode {
            return;
        }

        let target = format!("{}:{}", scan.address, scan.port);
        let (status, detail) = match &scan.outcome {
            ProbeOutcome::Reachable { response_time } => (
                if self.use_color {
                    "ok".green().to_string()
                } else {
                    "ok".to_string()
                },
                format!("{:.3}s", response_time),
            ),
            ProbeOutcome::Unreachable { reason, .. } => (
                if self.use_color {
                    "unreachable".red().bold().to_string()
                } else {
                    "unreachable".to_string()
                },
                reason.clone(),
            ),
        };

        let host = if self.use_color {
            scan.name.bright_white().bold().to_string()
        } else {
            scan.name.clone()
        };
        println!("{}: [{}] ({}) => {}", status, host, target, detail);
    }

    /// Print the scan recap
    pub fn scan_recap(&self, report: &ScanReport) {
        if self.json_mode {
            return;
        }

        let header = "SCAN RECAP";
        let stars = "*".repeat(60 - header.len());
        let reachable = report.reachable().count();
        let unreachable = report.unreachable().count();

        if self.use_color {
            println!("\n{} {}", header.bright_white().bold(), stars.bright_black());
            println!(
                "hosts={:<4} {}={:<4} {}={:<4}",
                report.total(),
                "reachable".green(),
                reachable,
                if unreachable > 0 {
                    "unreachable".red().bold()
                } else {
                    "unreachable".normal()
                },
                unreachable
            );
            println!(
                "\n{} {}",
                "Scan took".bright_black(),
                format_duration(report.duration).bright_white()
            );
        } else {
            println!("\n{} {}", header, stars);
            println!(
                "hosts={:<4} reachable={:<4} unreachable={:<4}",
                report.total(),
                reachable,
                unreachable
            );
            println!("\nScan took {}", format_duration(report.duration));
        }
    }

    /// Print a serializable value as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => self.error(&format!("failed to serialize output: {}", e)),
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            let warn = serde_json::json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{}", warn);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.json_mode {
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a list of items
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}:", title.bright_white().bold());
        } else {
            println!("\n{}:", title);
        }

        for item in items {
            if self.use_color {
                println!("  {} {}", "-".bright_black(), item);
            } else {
                println!("  - {}", item);
            }
        }
    }

    /// Print a table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            return;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let header_line = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:width$}", h, width = w))
            .collect::<Vec<_>>()
            .join(" | ");
        let sep = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");

        if self.use_color {
            println!("{}", header_line.bright_white().bold());
            println!("{}", sep.bright_black());
        } else {
            println!("{}", header_line);
            println!("{}", sep);
        }

        for row in rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:width$}", cell, width = w))
                .collect::<Vec<_>>()
                .join(" | ");
            println!("{}", line.trim_end());
        }
    }

    /// Print raw text unchanged
    pub fn plain(&self, text: &str) {
        println!("{}", text);
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
