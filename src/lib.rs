//! # o4n - Network Automation Helpers
//!
//! o4n bundles two standalone tools used around network device automation:
//!
//! - **Reachability scanner**: loads a static or dynamic inventory, probes
//!   every selected host with a TCP connect on its management port and
//!   writes the hosts that did not answer in time to a JSON report.
//! - **Config renderer**: extracts records from existing device
//!   configuration with a TTP-style template, drops records matched by
//!   ignore keys and renders the rest through a Jinja2-style template.
//!
//! ## Architecture Overview
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │   CLI (clap, o4n binary)     │
//!            └──────────────────────────────┘
//!                   │                │
//!                   ▼                ▼
//!   ┌────────────────────┐   ┌─────────────────────────┐
//!   │  scanner           │   │  render                 │
//!   │  (tokio + futures) │   │  ttp ──► template       │
//!   └────────────────────┘   └─────────────────────────┘
//!            │
//!            ▼
//!   ┌────────────────────┐
//!   │  inventory         │
//!   │  (static/dynamic)  │
//!   └────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use o4n::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let inventory = Inventory::load("hosts.ini")?;
//!     let hosts: Vec<&Host> = inventory.hosts().collect();
//!
//!     let report = Scanner::tcp(ScanConfig::default())
//!         .scan(&inventory, &hosts)
//!         .await?;
//!     report
//!         .unreachable_report()
//!         .write_to("unavailable_hosts.json".as_ref())?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{
        DynamicInventory, Group, Host, Inventory, InventoryKind, InventorySource,
    };
    pub use crate::render::{ContentSource, RenderOutcome, RenderRequest, Renderer};
    pub use crate::scanner::{
        ProbeOutcome, Prober, ScanConfig, ScanReport, Scanner, TcpProber, UnreachableReport,
    };
    pub use crate::template::TemplateEngine;
    pub use crate::ttp::{Record, TtpTemplate};
}

// ============================================================================
// Core
// ============================================================================

/// Error types shared across the crate.
pub mod error;

/// Configuration loading and merging.
pub mod config;

// ============================================================================
// Reachability scanning
// ============================================================================

/// Static and dynamic inventories, host patterns and group variables.
pub mod inventory;

/// Concurrent TCP reachability probes and the unreachable hosts report.
pub mod scanner;

// ============================================================================
// Config rendering
// ============================================================================

/// TTP-style extraction of records from device configuration.
pub mod ttp;

/// Jinja2-compatible template engine powered by minijinja.
pub mod template;

/// Extraction, ignore filtering, rendering and destination writing.
pub mod render;

pub use error::{Error, Result};

/// Returns the current version of o4n.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
