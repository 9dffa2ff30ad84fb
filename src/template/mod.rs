//! Jinja2-style rendering with minijinja.
//!
//! The engine is configured like Ansible's templating: block tags trim
//! their trailing newline and strip leading whitespace, undefined values
//! render empty unless strict mode is on, and the common Ansible string
//! and regex filters are available.

pub mod filters;

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;

use crate::error::{Error, Result};

/// Template environment used by the renderer
#[derive(Debug)]
pub struct TemplateEngine {
    env: Environment<'static>,
    strict: bool,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TemplateEngine {
    /// Create an engine; `strict` makes undefined variables an error
    pub fn new(strict: bool) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(if strict {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });

        add_builtin_filters(&mut env);
        filters::register_filters(&mut env);

        Self { env, strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Render template `source` against a serializable context
    pub fn render<S: Serialize>(&self, name: &str, source: &str, context: &S) -> Result<String> {
        let ctx = Value::from_serialize(context);
        self.env
            .render_named_str(name, source, ctx)
            .map_err(|e| Error::template_render(name, describe(&e)))
    }

    /// Check that `source` parses, without rendering it
    pub fn validate(&self, name: &str, source: &str) -> Result<()> {
        let mut env = self.env.clone();
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| Error::template_render(name, describe(&e)))
    }
}

/// Error text including the failing line when minijinja knows it
fn describe(err: &minijinja::Error) -> String {
    match err.line() {
        Some(line) => format!("{} (line {})", err, line),
        None => err.to_string(),
    }
}

/// String helpers Ansible templates commonly use
fn add_builtin_filters(env: &mut Environment<'static>) {
    env.add_filter("strip", |s: String| s.trim().to_string());
    env.add_filter("split", |s: String, sep: Option<String>| -> Vec<String> {
        match sep {
            Some(sep) => s.split(sep.as_str()).map(str::to_string).collect(),
            None => s.split_whitespace().map(str::to_string).collect(),
        }
    });
    env.add_filter("d", |value: Value, default: Value| -> Value {
        if value.is_undefined() || value.is_none() {
            default
        } else {
            value
        }
    });
    env.add_filter("bool", |value: Value| -> bool {
        match value.as_str() {
            Some(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "on" | "1"),
            None => value.is_true(),
        }
    });
    env.add_filter("to_json", |value: Value| -> String {
        serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
    });
    env.add_filter("to_nice_json", |value: Value| -> String {
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "null".to_string())
    });
    env.add_filter("to_yaml", |value: Value| -> String {
        serde_yaml::to_string(&value).unwrap_or_else(|_| "null".to_string())
    });
    env.add_filter("comment", |s: String, prefix: Option<String>| -> String {
        let prefix = prefix.unwrap_or_else(|| "! ".to_string());
        s.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    });
    env.add_filter(
        "ternary",
        |condition: bool, true_val: Value, false_val: Value| -> Value {
            if condition {
                true_val
            } else {
                false_val
            }
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple() {
        let engine = TemplateEngine::default();
        let out = engine
            .render("t", "interface {{ name }}\n description {{ descr }}\n", &ctx(&[("name", "Vlan10"), ("descr", "users")]))
            .unwrap();
        assert_eq!(out, "interface Vlan10\n description users");
    }

    #[test]
    fn test_undefined_renders_empty_when_lenient() {
        let engine = TemplateEngine::new(false);
        let out = engine.render("t", "vlan {{ missing }}", &ctx(&[])).unwrap();
        assert_eq!(out, "vlan ");
    }

    #[test]
    fn test_undefined_fails_when_strict() {
        let engine = TemplateEngine::new(true);
        let err = engine.render("t", "vlan {{ missing }}", &ctx(&[])).unwrap_err();
        assert!(matches!(err, Error::TemplateRender { .. }));
    }

    #[test]
    fn test_blocks_trim() {
        let engine = TemplateEngine::default();
        let out = engine
            .render(
                "t",
                "{% if shut == 'yes' %}\n shutdown\n{% endif %}\n no shutdown\n",
                &ctx(&[("shut", "yes")]),
            )
            .unwrap();
        assert_eq!(out, " shutdown\n no shutdown");
    }

    #[test]
    fn test_filters_available() {
        let engine = TemplateEngine::default();
        let out = engine
            .render(
                "t",
                "{{ name | regex_replace('GigabitEthernet', 'Gi') }} {{ flag | bool }} {{ none | d('n/a') }}",
                &ctx(&[("name", "GigabitEthernet1/0/1"), ("flag", "yes")]),
            )
            .unwrap();
        assert_eq!(out, "Gi1/0/1 True n/a");
    }

    #[test]
    fn test_validate_reports_syntax_errors() {
        let engine = TemplateEngine::default();
        assert!(engine.validate("t", "{{ ok }}").is_ok());
        assert!(engine.validate("t", "{% if %}").is_err());
    }
}
