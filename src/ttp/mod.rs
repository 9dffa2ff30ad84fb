//! Template-driven text extraction (a subset of TTP).
//!
//! An extraction template is device configuration text in which the
//! variable parts are replaced by `{{ name | item ... }}` placeholders:
//!
//! ```text
//! <group name="interfaces">
//! interface {{ interface | _start_ }}
//!  description {{ description | ORPHRASE }}
//!  ip address {{ ip | IP }} {{ mask | IP }}
//! </group>
//! ```
//!
//! [`TtpTemplate::compile`] turns the template into line matchers and
//! [`extract`] runs them over a configuration, producing one [`Record`]
//! per matched block.

pub mod parser;
pub mod template;

pub use parser::{extract, Record};
pub use template::{MatchLine, TemplateGroup, TtpTemplate, VarSpec};

use thiserror::Error;

/// Errors raised while compiling an extraction template
#[derive(Debug, Error)]
pub enum TtpError {
    #[error("template syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown template item '{item}' on line {line}")]
    UnknownItem { line: usize, item: String },

    #[error("nested <group> on line {line} is not supported")]
    NestedGroup { line: usize },

    #[error("<group> opened on line {line} is never closed")]
    UnclosedGroup { line: usize },

    #[error("invalid regex on line {line}: {source}")]
    InvalidRegex {
        line: usize,
        #[source]
        source: regex::Error,
    },
}

/// Compile `template` and extract records from `config` in one step
pub fn parse(template: &str, config: &str) -> Result<Vec<Record>, TtpError> {
    let compiled = TtpTemplate::compile(template)?;
    Ok(extract(&compiled, config))
}
