//! The unreachable hosts report.
//!
//! Serialized as a JSON object keyed by host name:
//!
//! ```json
//! {
//!    "SW-CORE_2": {
//!       "ip": "10.0.0.102",
//!       "response_time": null
//!    }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::HostScan;
use crate::error::{Error, Result};

/// Default file the report is written to
pub const DEFAULT_REPORT_PATH: &str = "unavailable_hosts.json";

/// One unreachable host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub ip: String,
    pub response_time: Option<f64>,
}

/// Unreachable hosts keyed by inventory name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnreachableReport {
    entries: BTreeMap<String, ReportEntry>,
}

impl UnreachableReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a report from the unreachable subset of a scan
    pub fn from_scans<'a>(scans: impl IntoIterator<Item = &'a HostScan>) -> Self {
        let entries = scans
            .into_iter()
            .filter(|s| !s.outcome.is_reachable())
            .map(|s| {
                (
                    s.name.clone(),
                    ReportEntry {
                        ip: s.address.clone(),
                        response_time: s.outcome.response_time(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, host: impl Into<String>, entry: ReportEntry) {
        self.entries.insert(host.into(), entry);
    }

    pub fn get(&self, host: &str) -> Option<&ReportEntry> {
        self.entries.get(host)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON text with three-space indentation
    pub fn to_json_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Other {
            message: "report is not valid UTF-8".into(),
            source: Some(Box::new(e)),
        })
    }

    /// Write the report, replacing any previous one
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| Error::report_write(path, e.to_string()))?;
        info!(path = %path.display(), hosts = self.len(), "wrote unreachable hosts report");
        Ok(())
    }

    /// Read a report written by [`UnreachableReport::write_to`]
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ProbeOutcome;
    use pretty_assertions::assert_eq;

    fn scan(name: &str, address: &str, outcome: ProbeOutcome) -> HostScan {
        HostScan {
            name: name.into(),
            address: address.into(),
            port: 22,
            outcome,
        }
    }

    #[test]
    fn test_report_uses_three_space_indent() {
        let mut report = UnreachableReport::new();
        report.insert(
            "SW-CORE_2",
            ReportEntry {
                ip: "10.0.0.102".into(),
                response_time: None,
            },
        );

        let expected = "{\n   \"SW-CORE_2\": {\n      \"ip\": \"10.0.0.102\",\n      \"response_time\": null\n   }\n}";
        assert_eq!(report.to_json_string().unwrap(), expected);
    }

    #[test]
    fn test_from_scans_keeps_only_unreachable() {
        let scans = vec![
            scan("a", "10.0.0.1", ProbeOutcome::Reachable { response_time: 0.01 }),
            scan(
                "b",
                "10.0.0.2",
                ProbeOutcome::Unreachable {
                    response_time: Some(7.5),
                    reason: "slow".into(),
                },
            ),
        ];

        let report = UnreachableReport::from_scans(&scans);
        assert_eq!(report.hosts().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(report.get("b").unwrap().response_time, Some(7.5));
    }

    #[test]
    fn test_empty_report_serializes_as_empty_object() {
        assert_eq!(UnreachableReport::new().to_json_string().unwrap(), "{}");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_REPORT_PATH);

        let mut report = UnreachableReport::new();
        report.insert(
            "G3_ACCESO",
            ReportEntry {
                ip: "10.2.7.11".into(),
                response_time: None,
            },
        );
        report.write_to(&path).unwrap();

        assert_eq!(UnreachableReport::read_from(&path).unwrap(), report);
    }
}
