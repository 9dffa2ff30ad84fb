//! Record extraction from configuration text.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::template::{MatchLine, TemplateGroup, TtpTemplate};

/// Variables captured from one matched block of configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// Template group that produced the record
    #[serde(skip)]
    pub group: Option<String>,
    #[serde(flatten)]
    pub values: IndexMap<String, String>,
}

impl Record {
    fn new(group: Option<String>) -> Self {
        Self {
            group,
            values: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether any value starts with one of the given prefixes
    pub fn matches_any_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        self.values.values().any(|value| {
            prefixes
                .iter()
                .map(AsRef::as_ref)
                .filter(|p| !p.is_empty())
                .any(|p| value.starts_with(p))
        })
    }

    fn absorb(&mut self, line: &MatchLine, captures: Vec<(String, String)>) {
        for (name, value) in captures {
            let joins = line.vars.iter().any(|v| v.name == name && v.join_lines);
            match self.values.get_mut(&name) {
                Some(existing) if joins => {
                    existing.push('\n');
                    existing.push_str(&value);
                }
                Some(_) => {}
                None => {
                    self.values.insert(name, value);
                }
            }
        }
    }
}

/// Run a compiled template over `config`
///
/// Records come out grouped in template order, and in configuration order
/// within a group.
pub fn extract(template: &TtpTemplate, config: &str) -> Vec<Record> {
    let mut records = Vec::new();

    for group in &template.groups {
        let found = extract_group(group, config);
        debug!(
            group = group.name.as_deref().unwrap_or("_"),
            records = found.len(),
            "extracted group"
        );
        records.extend(found);
    }

    records
}

fn extract_group(group: &TemplateGroup, config: &str) -> Vec<Record> {
    let start_lines = group.start_lines();
    let mut records = Vec::new();
    let mut current: Option<Record> = None;

    for text in config.lines() {
        let text = text.trim_end_matches('\r');

        let start_hit = start_lines.iter().find_map(|&idx| {
            let line = &group.lines[idx];
            line.captures(text).map(|caps| (line, caps))
        });
        if let Some((line, caps)) = start_hit {
            close(&mut current, &mut records);
            let mut record = Record::new(group.name.clone());
            record.absorb(line, caps);
            if line.end {
                if !record.is_empty() {
                    records.push(record);
                }
            } else {
                current = Some(record);
            }
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };

        let body_hit = group
            .lines
            .iter()
            .enumerate()
            .filter(|(idx, l)| !start_lines.contains(idx) && !l.is_line_collector())
            .chain(
                group
                    .lines
                    .iter()
                    .enumerate()
                    .filter(|(idx, l)| !start_lines.contains(idx) && l.is_line_collector()),
            )
            .find_map(|(_, line)| line.captures(text).map(|caps| (line, caps)));

        if let Some((line, caps)) = body_hit {
            record.absorb(line, caps);
            if line.end {
                close(&mut current, &mut records);
            }
        }
    }

    close(&mut current, &mut records);
    records
}

fn close(current: &mut Option<Record>, records: &mut Vec<Record>) {
    if let Some(record) = current.take() {
        if !record.is_empty() {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = "\
hostname SW-CORE_1
!
interface Vlan10
 description users
 ip address 10.10.0.1 255.255.255.0
!
interface Vlan20
 description servers dc
 ip address 10.20.0.1 255.255.255.0
 shutdown
!
interface Vlan30
!
";

    fn values(records: &[Record]) -> Vec<Vec<(&str, &str)>> {
        records
            .iter()
            .map(|r| r.values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect())
            .collect()
    }

    #[test]
    fn test_blocks_become_records() {
        let tpl = TtpTemplate::compile(
            "interface {{ interface }}\n description {{ description | ORPHRASE }}\n ip address {{ ip | IP }} {{ mask }}",
        )
        .unwrap();

        let records = extract(&tpl, CONFIG);
        assert_eq!(
            values(&records),
            vec![
                vec![
                    ("interface", "Vlan10"),
                    ("description", "users"),
                    ("ip", "10.10.0.1"),
                    ("mask", "255.255.255.0"),
                ],
                vec![
                    ("interface", "Vlan20"),
                    ("description", "servers dc"),
                    ("ip", "10.20.0.1"),
                    ("mask", "255.255.255.0"),
                ],
                vec![("interface", "Vlan30")],
            ]
        );
    }

    #[test]
    fn test_end_closes_record() {
        let tpl = TtpTemplate::compile(
            "interface {{ interface | _start_ }}\n description {{ description | ORPHRASE | _end_ }}\n ip address {{ ip | IP }} {{ mask }}",
        )
        .unwrap();

        let records = extract(&tpl, CONFIG);
        assert_eq!(records[0].get("ip"), None);
        assert_eq!(records[0].get("description"), Some("users"));
    }

    #[test]
    fn test_line_collector_joins_values() {
        let tpl = TtpTemplate::compile(
            "interface {{ interface | _start_ }}\n{{ body | _line_ }}",
        )
        .unwrap();

        let records = extract(&tpl, "interface Gi1\n mtu 9000\n shutdown\ninterface Gi2\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("body"), Some("mtu 9000\nshutdown"));
        assert_eq!(records[1].get("body"), None);
    }

    #[test]
    fn test_first_value_wins() {
        let tpl = TtpTemplate::compile("router bgp {{ asn | _start_ }}\n neighbor {{ peer | IP }} {{ ignore | ORPHRASE }}")
            .unwrap();

        let records = extract(&tpl, "router bgp 65000\n neighbor 192.0.2.1 remote-as 1\n neighbor 192.0.2.2 remote-as 2\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("peer"), Some("192.0.2.1"));
    }

    #[test]
    fn test_groups_in_template_order() {
        let tpl = TtpTemplate::compile(
            "<group name=\"vlans\">\ninterface {{ interface }}\n</group>\nhostname {{ hostname }}",
        )
        .unwrap();

        let records = extract(&tpl, CONFIG);
        assert_eq!(records[0].group, None);
        assert_eq!(records[0].get("hostname"), Some("SW-CORE_1"));
        assert_eq!(records[1].group.as_deref(), Some("vlans"));
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_records_without_saved_values_are_dropped() {
        let tpl = TtpTemplate::compile("interface {{ ignore }}").unwrap();
        assert!(extract(&tpl, CONFIG).is_empty());
    }

    #[test]
    fn test_no_match_yields_nothing() {
        let tpl = TtpTemplate::compile("vrf definition {{ vrf }}").unwrap();
        assert!(extract(&tpl, CONFIG).is_empty());
    }

    #[test]
    fn test_prefix_match() {
        let mut record = Record::default();
        record.values.insert("interface".into(), "Vlan10".into());

        assert!(record.matches_any_prefix(&["Vlan"]));
        assert!(!record.matches_any_prefix(&["Gi"]));
        assert!(!record.matches_any_prefix(&[""]));
    }
}
