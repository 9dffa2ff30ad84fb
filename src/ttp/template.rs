//! Extraction template compilation.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use super::TtpError;

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("valid placeholder regex"));

static GROUP_OPEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<group(?:\s+name\s*=\s*(?:"([^"]*)"|'([^']*)'))?\s*>\s*$"#)
        .expect("valid group regex")
});

static GROUP_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*</group>\s*$").expect("valid group close regex"));

static VAR_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name regex"));

static RE_ITEM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^re\(\s*(?:"(.*)"|'(.*)')\s*\)$"#).expect("valid re() regex"));

/// Variable name that is matched but never saved
pub const IGNORE_VAR: &str = "ignore";

/// Named regex formatters
pub fn formatter_pattern(name: &str) -> Option<&'static str> {
    Some(match name {
        "WORD" => r"\S+",
        "PHRASE" => r"\S+(?: \S+)+",
        "ORPHRASE" => r"\S+(?: \S+)*",
        "DIGIT" => r"\d+",
        "IP" => r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}",
        "PREFIX" => r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}/[0-9]{1,2}",
        "IPV6" => r"(?:[a-fA-F0-9]{1,4}:|:){1,7}(?:[a-fA-F0-9]{1,4}|:?)",
        "MAC" => {
            r"(?:[0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}|(?:[0-9a-fA-F]{4}\.){2}[0-9a-fA-F]{4}"
        }
        "ROW" => r"(?:\S+ +)+\S+",
        _ => return None,
    })
}

/// One placeholder of a match line
#[derive(Debug, Clone, PartialEq)]
pub struct VarSpec {
    pub name: String,
    /// Regex the value must match
    pub pattern: String,
    /// `_line_`: repeated matches are joined with newlines
    pub join_lines: bool,
}

impl VarSpec {
    pub fn is_saved(&self) -> bool {
        self.name != IGNORE_VAR
    }
}

/// A template line with at least one placeholder
#[derive(Debug, Clone)]
pub struct MatchLine {
    /// 1-based line number in the template
    pub line_no: usize,
    pub regex: Regex,
    pub vars: Vec<VarSpec>,
    pub start: bool,
    pub end: bool,
}

impl MatchLine {
    /// Whether any placeholder on this line is `_line_`
    pub fn is_line_collector(&self) -> bool {
        self.vars.iter().any(|v| v.join_lines)
    }

    /// Match a configuration line, returning `(name, value)` for saved variables
    pub fn captures(&self, text: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(text)?;
        Some(
            self.vars
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_saved())
                .filter_map(|(idx, v)| {
                    caps.name(&format!("v{}", idx))
                        .map(|m| (v.name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// A `<group>` block, or the lines outside any group
#[derive(Debug, Clone)]
pub struct TemplateGroup {
    pub name: Option<String>,
    pub lines: Vec<MatchLine>,
}

impl TemplateGroup {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            lines: Vec::new(),
        }
    }

    /// Indices of the lines that open a record
    pub fn start_lines(&self) -> Vec<usize> {
        let marked: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.start)
            .map(|(i, _)| i)
            .collect();
        if marked.is_empty() && !self.lines.is_empty() {
            vec![0]
        } else {
            marked
        }
    }
}

/// A compiled extraction template
#[derive(Debug, Clone)]
pub struct TtpTemplate {
    pub groups: Vec<TemplateGroup>,
}

impl TtpTemplate {
    /// Compile template text into line matchers
    pub fn compile(text: &str) -> Result<Self, TtpError> {
        let mut top_level = TemplateGroup::new(None);
        let mut named: Vec<TemplateGroup> = Vec::new();
        let mut open: Option<(usize, TemplateGroup)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;

            if let Some(caps) = GROUP_OPEN_REGEX.captures(raw) {
                if open.is_some() {
                    return Err(TtpError::NestedGroup { line: line_no });
                }
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string());
                open = Some((line_no, TemplateGroup::new(name)));
                continue;
            }

            if GROUP_CLOSE_REGEX.is_match(raw) {
                match open.take() {
                    Some((_, group)) => named.push(group),
                    None => {
                        return Err(TtpError::Syntax {
                            line: line_no,
                            message: "</group> without matching <group>".into(),
                        })
                    }
                }
                continue;
            }

            if !PLACEHOLDER_REGEX.is_match(raw) {
                continue;
            }

            let matcher = compile_line(line_no, raw)?;
            trace!(line = line_no, regex = %matcher.regex, "compiled match line");
            match open.as_mut() {
                Some((_, group)) => group.lines.push(matcher),
                None => top_level.lines.push(matcher),
            }
        }

        if let Some((line, _)) = open {
            return Err(TtpError::UnclosedGroup { line });
        }

        let mut groups = Vec::with_capacity(named.len() + 1);
        if !top_level.lines.is_empty() {
            groups.push(top_level);
        }
        groups.extend(named);
        Ok(Self { groups })
    }

    /// Number of match lines across all groups
    pub fn match_line_count(&self) -> usize {
        self.groups.iter().map(|g| g.lines.len()).sum()
    }
}

/// Strip extraction syntax so the template can be rendered with Jinja:
/// group tags are dropped and placeholders keep only their variable name.
pub fn to_render_template(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        if GROUP_OPEN_REGEX.is_match(line) || GROUP_CLOSE_REGEX.is_match(line) {
            continue;
        }
        let stripped = PLACEHOLDER_REGEX.replace_all(line, |caps: &regex::Captures<'_>| {
            let name = split_items(&caps[1])
                .into_iter()
                .next()
                .unwrap_or_default();
            format!("{{{{ {} }}}}", name.trim())
        });
        out.push_str(&stripped);
        out.push('\n');
    }

    out
}

fn compile_line(line_no: usize, raw: &str) -> Result<MatchLine, TtpError> {
    let body = raw.trim();
    let exact = PLACEHOLDER_REGEX
        .captures_iter(body)
        .any(|c| split_items(&c[1]).iter().skip(1).any(|i| i.trim() == "_exact_"));

    let mut pattern = String::from(r"^[ \t]*");
    let mut vars = Vec::new();
    let mut start = false;
    let mut end = false;
    let mut last = 0;

    for caps in PLACEHOLDER_REGEX.captures_iter(body) {
        let whole = caps.get(0).ok_or_else(|| TtpError::Syntax {
            line: line_no,
            message: "malformed placeholder".into(),
        })?;
        push_literal(&mut pattern, &body[last..whole.start()], exact);
        last = whole.end();

        let var = parse_placeholder(line_no, &caps[1], &mut start, &mut end)?;
        pattern.push_str(&format!("(?P<v{}>{})", vars.len(), var.pattern));
        vars.push(var);
    }
    push_literal(&mut pattern, &body[last..], exact);
    pattern.push_str(r"[ \t]*$");

    let regex = Regex::new(&pattern).map_err(|source| TtpError::InvalidRegex {
        line: line_no,
        source,
    })?;

    Ok(MatchLine {
        line_no,
        regex,
        vars,
        start,
        end,
    })
}

fn parse_placeholder(
    line_no: usize,
    content: &str,
    start: &mut bool,
    end: &mut bool,
) -> Result<VarSpec, TtpError> {
    let items = split_items(content);
    let mut items = items.iter().map(|s| s.trim());

    let name = items.next().unwrap_or_default();
    if !VAR_NAME_REGEX.is_match(name) {
        return Err(TtpError::Syntax {
            line: line_no,
            message: format!("invalid variable name '{}'", name),
        });
    }

    let mut pattern: Option<String> = None;
    let mut join_lines = false;

    for item in items {
        match item {
            "_start_" => *start = true,
            "_end_" => *end = true,
            "_line_" => join_lines = true,
            "_exact_" => {}
            _ => {
                if let Some(p) = formatter_pattern(item) {
                    pattern = Some(p.to_string());
                } else if let Some(caps) = RE_ITEM_REGEX.captures(item) {
                    let inner = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    let p = formatter_pattern(inner)
                        .map(str::to_string)
                        .unwrap_or_else(|| inner.to_string());
                    pattern = Some(p);
                } else {
                    return Err(TtpError::UnknownItem {
                        line: line_no,
                        item: item.to_string(),
                    });
                }
            }
        }
    }

    let default = if join_lines { ".+" } else { r"\S+" };
    let pattern = pattern.unwrap_or_else(|| default.to_string());

    Ok(VarSpec {
        name: name.to_string(),
        pattern: format!("(?:{})", pattern),
        join_lines,
    })
}

/// Split placeholder content on `|`, leaving quoted text alone
fn split_items(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in content.chars() {
        match (ch, quote) {
            ('"' | '\'', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(ch);
            }
            ('|', None) => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);
    items
}

/// Append literal template text, generalising whitespace and digits
fn push_literal(pattern: &mut String, literal: &str, exact: bool) {
    let mut chars = literal.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            pattern.push_str(r"[ \t]+");
        } else if ch.is_ascii_digit() && !exact {
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
            pattern.push_str(r"\d+");
        } else {
            pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple_line() {
        let tpl = TtpTemplate::compile("hostname {{ hostname }}").unwrap();
        assert_eq!(tpl.groups.len(), 1);

        let line = &tpl.groups[0].lines[0];
        let caps = line.captures("hostname SW-CORE_1").unwrap();
        assert_eq!(caps, vec![("hostname".to_string(), "SW-CORE_1".to_string())]);
        assert!(line.captures("hostname").is_none());
    }

    #[test]
    fn test_whitespace_and_digits_are_generalised() {
        let tpl = TtpTemplate::compile(" interface Vlan10 {{ descr }}").unwrap();
        let line = &tpl.groups[0].lines[0];

        assert!(line.captures("interface   Vlan200 uplink").is_some());
        assert!(line.captures("  interface Vlan7 uplink  ").is_some());
    }

    #[test]
    fn test_exact_keeps_digits() {
        let tpl = TtpTemplate::compile("interface Vlan10 {{ descr | _exact_ }}").unwrap();
        let line = &tpl.groups[0].lines[0];

        assert!(line.captures("interface Vlan10 mgmt").is_some());
        assert!(line.captures("interface Vlan20 mgmt").is_none());
    }

    #[test]
    fn test_formatters() {
        let tpl = TtpTemplate::compile(
            "ip address {{ ip | IP }} {{ mask | re(\"IP\") }}\ndescription {{ d | ORPHRASE }}",
        )
        .unwrap();
        let lines = &tpl.groups[0].lines;

        assert!(lines[0].captures("ip address 10.0.0.1 255.255.255.0").is_some());
        assert!(lines[0].captures("ip address dhcp 255.255.255.0").is_none());
        let caps = lines[1].captures("description link to core 1").unwrap();
        assert_eq!(caps[0].1, "link to core 1");
    }

    #[test]
    fn test_custom_regex_with_pipe() {
        let tpl = TtpTemplate::compile(r#"mode {{ mode | re("access|trunk") }}"#).unwrap();
        let line = &tpl.groups[0].lines[0];
        assert!(line.captures("mode trunk").is_some());
        assert!(line.captures("mode hybrid").is_none());
    }

    #[test]
    fn test_ignore_is_matched_not_saved() {
        let tpl = TtpTemplate::compile("vlan {{ ignore }} name {{ name }}").unwrap();
        let caps = tpl.groups[0].lines[0].captures("vlan 10 name users").unwrap();
        assert_eq!(caps, vec![("name".to_string(), "users".to_string())]);
    }

    #[test]
    fn test_groups_and_start() {
        let tpl = TtpTemplate::compile(
            "hostname {{ hostname }}\n<group name=\"interfaces\">\ninterface {{ interface | _start_ }}\n description {{ description | ORPHRASE }}\n</group>\n",
        )
        .unwrap();

        assert_eq!(tpl.groups.len(), 2);
        assert_eq!(tpl.groups[0].name, None);
        assert_eq!(tpl.groups[1].name.as_deref(), Some("interfaces"));
        assert_eq!(tpl.groups[1].start_lines(), vec![0]);
        assert_eq!(tpl.match_line_count(), 3);
    }

    #[test]
    fn test_variable_names_must_be_jinja_identifiers() {
        let err = TtpTemplate::compile("description {{ if-descr }}").unwrap_err();
        assert!(matches!(err, TtpError::Syntax { line: 1, .. }));
        assert!(TtpTemplate::compile("description {{ if_descr }}").is_ok());
    }

    #[test]
    fn test_unknown_item_is_error() {
        let err = TtpTemplate::compile("hostname {{ hostname | upper }}").unwrap_err();
        assert!(matches!(err, TtpError::UnknownItem { line: 1, .. }));
    }

    #[test]
    fn test_group_errors() {
        let nested = "<group name=\"a\">\n<group name=\"b\">\n</group>\n</group>";
        assert!(matches!(
            TtpTemplate::compile(nested).unwrap_err(),
            TtpError::NestedGroup { line: 2 }
        ));

        let unclosed = "<group name=\"a\">\nx {{ y }}";
        assert!(matches!(
            TtpTemplate::compile(unclosed).unwrap_err(),
            TtpError::UnclosedGroup { line: 1 }
        ));

        assert!(matches!(
            TtpTemplate::compile("</group>").unwrap_err(),
            TtpError::Syntax { line: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_regex() {
        let err = TtpTemplate::compile(r#"x {{ y | re("(unclosed") }}"#).unwrap_err();
        assert!(matches!(err, TtpError::InvalidRegex { .. }));
    }

    #[test]
    fn test_to_render_template() {
        let text = "<group name=\"vlans\">\nvlan {{ vlan | DIGIT | _start_ }}\n name {{ name }}\n</group>\n";
        assert_eq!(to_render_template(text), "vlan {{ vlan }}\n name {{ name }}\n");
    }
}
