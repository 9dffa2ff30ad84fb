//! Regular expression filters for rendered configuration.
//!
//! - `regex_search`: first match (or first group) of a pattern
//! - `regex_match`: whether a pattern matches
//! - `regex_replace`: replace matches, accepting `\1` style backreferences
//! - `regex_findall`: every match of a pattern
//! - `regex_escape`: escape regex metacharacters
//! - `regex_split`: split on a pattern
//!
//! ```jinja2
//! {{ interface | regex_replace('^GigabitEthernet', 'Gi') }}
//! {{ 'Vlan120' | regex_search('[0-9]+') }}
//! ```

use minijinja::{Environment, Value};
use once_cell::sync::Lazy;
use regex::Regex;

static BACKREF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(\d)").expect("valid backreference regex"));

/// Register all regex filters with the given environment.
pub fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("regex_search", regex_search);
    env.add_filter("regex_match", regex_match);
    env.add_filter("regex_replace", regex_replace);
    env.add_filter("regex_findall", regex_findall);
    env.add_filter("regex_escape", regex_escape);
    env.add_filter("regex_split", regex_split);
}

fn compile(pattern: &str, ignorecase: Option<bool>) -> Option<Regex> {
    let pattern = if ignorecase.unwrap_or(false) {
        format!("(?i){}", pattern)
    } else {
        pattern.to_string()
    };
    Regex::new(&pattern).ok()
}

/// First capture group when the pattern has one, else the whole match.
/// An empty string when nothing matches.
fn regex_search(input: String, pattern: String, ignorecase: Option<bool>) -> Value {
    let found = compile(&pattern, ignorecase).and_then(|re| {
        re.captures(&input).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
        })
    });
    Value::from(found.unwrap_or_default())
}

fn regex_match(input: String, pattern: String, ignorecase: Option<bool>) -> bool {
    compile(&pattern, ignorecase).is_some_and(|re| re.is_match(&input))
}

fn regex_replace(
    input: String,
    pattern: String,
    replacement: String,
    ignorecase: Option<bool>,
) -> String {
    let Some(re) = compile(&pattern, ignorecase) else {
        return input;
    };
    let replacement = BACKREF_REGEX.replace_all(&replacement, "$${$1}");
    re.replace_all(&input, replacement.as_ref()).into_owned()
}

fn regex_findall(input: String, pattern: String, ignorecase: Option<bool>) -> Vec<Value> {
    let Some(re) = compile(&pattern, ignorecase) else {
        return Vec::new();
    };

    if re.captures_len() > 1 {
        re.captures_iter(&input)
            .filter_map(|caps| caps.get(1).map(|m| Value::from(m.as_str().to_string())))
            .collect()
    } else {
        re.find_iter(&input)
            .map(|m| Value::from(m.as_str().to_string()))
            .collect()
    }
}

fn regex_escape(input: String) -> String {
    regex::escape(&input)
}

fn regex_split(input: String, pattern: String) -> Vec<String> {
    match Regex::new(&pattern) {
        Ok(re) => re.split(&input).map(str::to_string).collect(),
        Err(_) => vec![input],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_search() {
        assert_eq!(
            regex_search("Vlan120".into(), "[0-9]+".into(), None).to_string(),
            "120"
        );
        assert_eq!(
            regex_search("Gi1/0/1".into(), r"Gi(\d+)/".into(), None).to_string(),
            "1"
        );
        assert_eq!(regex_search("mgmt".into(), "[0-9]+".into(), None).to_string(), "");
    }

    #[test]
    fn test_regex_match_ignorecase() {
        assert!(regex_match("VLAN10".into(), "^vlan".into(), Some(true)));
        assert!(!regex_match("VLAN10".into(), "^vlan".into(), None));
    }

    #[test]
    fn test_regex_replace_backreferences() {
        let out = regex_replace(
            "GigabitEthernet1/0/1".into(),
            r"GigabitEthernet(\S+)".into(),
            r"Gi\1".into(),
            None,
        );
        assert_eq!(out, "Gi1/0/1");
    }

    #[test]
    fn test_regex_replace_invalid_pattern_keeps_input() {
        assert_eq!(regex_replace("abc".into(), "(".into(), "x".into(), None), "abc");
    }

    #[test]
    fn test_regex_findall() {
        let found = regex_findall("10.0.0.1 10.0.0.2".into(), r"\d+\.\d+\.\d+\.(\d+)".into(), None);
        assert_eq!(found, vec![Value::from("1"), Value::from("2")]);
    }

    #[test]
    fn test_regex_escape_and_split() {
        assert_eq!(regex_escape("1.1".into()), r"1\.1");
        assert_eq!(regex_split("a, b,c".into(), r",\s*".into()), vec!["a", "b", "c"]);
    }
}
