//! Configuration rendering.
//!
//! Existing device configuration is parsed with an extraction template,
//! records whose values start with an ignore key are set aside, and every
//! remaining record is rendered through a Jinja2-style template. The
//! rendered blocks are joined with newlines and optionally written to a
//! destination file.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::template::TemplateEngine;
use crate::ttp::{self, Record, TtpTemplate};

/// Where a piece of renderer input comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Inline(String),
    File(PathBuf),
}

impl ContentSource {
    /// Read the content, returning it with its source label
    /// (`inline` or `file:<path>`)
    pub fn load(&self) -> Result<(String, String)> {
        match self {
            ContentSource::Inline(text) => Ok((text.clone(), "inline".to_string())),
            ContentSource::File(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path.clone()));
                }
                let text = std::fs::read_to_string(path)?;
                Ok((text, format!("file:{}", path.display())))
            }
        }
    }

    /// Pick between an inline value and a file path; exactly one must be set
    pub fn from_pair(
        what: &str,
        inline: Option<String>,
        file: Option<PathBuf>,
    ) -> Result<Self> {
        match (inline, file) {
            (Some(text), None) => Ok(ContentSource::Inline(text)),
            (None, Some(path)) => Ok(ContentSource::File(path)),
            (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
                "{what} and {what}_src are mutually exclusive"
            ))),
            (None, None) => Err(Error::InvalidInput(format!(
                "one of {what} or {what}_src is required"
            ))),
        }
    }
}

/// Labels of the inputs that were used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUsed {
    pub config_source: String,
    pub template_source: String,
}

/// Everything the renderer needs for one run
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub config: ContentSource,
    /// Extraction template
    pub template: ContentSource,
    /// Render template; derived from the extraction template when absent
    pub render_template: Option<ContentSource>,
    pub ignore_keys: Vec<String>,
    pub extra_vars: IndexMap<String, serde_json::Value>,
    /// Destination path, itself a template over the extra vars
    pub dest: Option<String>,
    pub check_mode: bool,
}

impl RenderRequest {
    pub fn new(config: ContentSource, template: ContentSource) -> Self {
        Self {
            config,
            template,
            render_template: None,
            ignore_keys: Vec::new(),
            extra_vars: IndexMap::new(),
            dest: None,
            check_mode: false,
        }
    }

    pub fn with_render_template(mut self, source: ContentSource) -> Self {
        self.render_template = Some(source);
        self
    }

    /// Ignore records with a value starting with any of `keys`; empty keys
    /// are dropped
    pub fn with_ignore_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_keys = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.is_empty())
            .collect();
        self
    }

    pub fn with_extra_vars(mut self, vars: IndexMap<String, serde_json::Value>) -> Self {
        self.extra_vars = vars;
        self
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn check_mode(mut self, check: bool) -> Self {
        self.check_mode = check;
        self
    }
}

/// Result of a render run
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub changed: bool,
    pub rendered_config: String,
    pub ignored_instances: Vec<Record>,
    pub render_data: Vec<Record>,
    pub source_used: SourceUsed,
    pub dest_path: Option<PathBuf>,
}

/// Split records into `(kept, ignored)` by value prefix
pub fn partition_records<S: AsRef<str>>(
    records: Vec<Record>,
    ignore_keys: &[S],
) -> (Vec<Record>, Vec<Record>) {
    records
        .into_iter()
        .partition(|record| !record.matches_any_prefix(ignore_keys))
}

/// Write `content` to `path` unless it already holds exactly that.
/// Returns whether the file changed (or would change in check mode).
pub fn write_if_changed(path: &Path, content: &str, check_mode: bool) -> Result<bool> {
    if path.exists() {
        let current = std::fs::read_to_string(path)?;
        if current == content {
            debug!(path = %path.display(), "destination already up to date");
            return Ok(false);
        }
    }

    if check_mode {
        return Ok(true);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!(path = %path.display(), bytes = content.len(), "wrote rendered configuration");
    Ok(true)
}

/// Runs extraction and rendering
#[derive(Debug, Default)]
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// `strict` makes undefined template variables an error
    pub fn new(strict: bool) -> Self {
        Self {
            engine: TemplateEngine::new(strict),
        }
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderOutcome> {
        let (config, config_source) = request.config.load()?;
        let (template, template_source) = request.template.load()?;

        let compiled = TtpTemplate::compile(&template)?;
        let records = ttp::extract(&compiled, &config);
        debug!(records = records.len(), "extracted records");
        if records.is_empty() {
            return Err(Error::NoMatches);
        }

        let (render_source, render_name) = match &request.render_template {
            Some(source) => {
                let (text, label) = source.load()?;
                (text, label)
            }
            None => (
                crate::ttp::template::to_render_template(&template),
                template_source.clone(),
            ),
        };
        self.engine.validate(&render_name, &render_source)?;

        let (render_data, ignored_instances) =
            partition_records(records, &request.ignore_keys);
        if !ignored_instances.is_empty() {
            info!(ignored = ignored_instances.len(), "records matched ignore keys");
        }

        let blocks = render_data
            .iter()
            .map(|record| {
                let context = record_context(&request.extra_vars, record);
                self.engine.render(&render_name, &render_source, &context)
            })
            .collect::<Result<Vec<_>>>()?;
        let rendered_config = blocks.join("\n");

        let dest_path = match &request.dest {
            Some(dest) => {
                let rendered = self
                    .engine
                    .render("dest_path", dest, &request.extra_vars)?;
                Some(PathBuf::from(rendered.trim()))
            }
            None => None,
        };

        let changed = match &dest_path {
            Some(path) => write_if_changed(path, &rendered_config, request.check_mode)?,
            None => false,
        };

        Ok(RenderOutcome {
            changed,
            rendered_config,
            ignored_instances,
            render_data,
            source_used: SourceUsed {
                config_source,
                template_source,
            },
            dest_path,
        })
    }
}

/// Extra vars overlaid by the record's own values
fn record_context(
    extra_vars: &IndexMap<String, serde_json::Value>,
    record: &Record,
) -> serde_json::Map<String, serde_json::Value> {
    let mut context: serde_json::Map<String, serde_json::Value> = extra_vars
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, value) in &record.values {
        context.insert(key.clone(), serde_json::Value::String(value.clone()));
    }
    context
}
