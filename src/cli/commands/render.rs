//! Render command - build device configuration from parsed config
//!
//! This module implements the `render` subcommand.

use super::{CommandContext, Runnable};
use anyhow::Result;
use clap::Parser;
use o4n::render::{ContentSource, RenderOutcome, RenderRequest, Renderer};
use std::path::PathBuf;

/// Arguments for the render command
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    /// Existing device configuration, inline
    #[arg(long, conflicts_with = "config_src")]
    pub config: Option<String>,

    /// File holding the existing device configuration
    #[arg(long = "config-src")]
    pub config_src: Option<PathBuf>,

    /// Extraction template, inline
    #[arg(long, conflicts_with = "template_src")]
    pub template: Option<String>,

    /// File holding the extraction template
    #[arg(long = "template-src")]
    pub template_src: Option<PathBuf>,

    /// Render template, inline (defaults to the extraction template)
    #[arg(long = "render-template", conflicts_with = "render_template_src")]
    pub render_template: Option<String>,

    /// File holding the render template
    #[arg(long = "render-template-src")]
    pub render_template_src: Option<PathBuf>,

    /// Skip records with a value starting with this key (repeatable)
    #[arg(long = "ignore", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Write the rendered config here; may use extra vars, e.g. `{{ host }}.cfg`
    #[arg(long)]
    pub dest: Option<String>,

    /// Compute the result without writing the destination file
    #[arg(long)]
    pub check: bool,

    /// Fail on undefined template variables
    #[arg(long)]
    pub strict: bool,
}

impl RenderArgs {
    /// Build the renderer request from flags and extra vars
    pub fn request(&self, ctx: &CommandContext) -> Result<RenderRequest> {
        let config = ContentSource::from_pair("config", self.config.clone(), self.config_src.clone())?;
        let template =
            ContentSource::from_pair("template", self.template.clone(), self.template_src.clone())?;

        let mut request = RenderRequest::new(config, template)
            .with_ignore_keys(self.ignore.iter().cloned())
            .with_extra_vars(ctx.parse_extra_vars()?)
            .check_mode(self.check);

        if self.render_template.is_some() || self.render_template_src.is_some() {
            request = request.with_render_template(ContentSource::from_pair(
                "render_template",
                self.render_template.clone(),
                self.render_template_src.clone(),
            )?);
        }
        if let Some(dest) = &self.dest {
            request = request.with_dest(dest.clone());
        }

        Ok(request)
    }

    /// Execute the render command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let request = self.request(ctx)?;
        let renderer = Renderer::new(self.strict || ctx.config.render.strict);
        let outcome = renderer.render(&request)?;

        if ctx.output.is_json() {
            ctx.output.json(&outcome);
            return Ok(0);
        }

        ctx.output.plain(&outcome.rendered_config);
        self.report_destination(ctx, &outcome);
        Ok(0)
    }

    fn report_destination(&self, ctx: &CommandContext, outcome: &RenderOutcome) {
        if !outcome.ignored_instances.is_empty() {
            ctx.output.info(&format!(
                "{} record(s) ignored, {} rendered",
                outcome.ignored_instances.len(),
                outcome.render_data.len()
            ));
        }

        let Some(path) = &outcome.dest_path else {
            return;
        };
        let message = match (outcome.changed, self.check) {
            (false, _) => format!("{} is up to date", path.display()),
            (true, true) => format!("{} would be changed (check mode)", path.display()),
            (true, false) => format!("wrote {}", path.display()),
        };
        ctx.output.hint(&message);
    }
}

#[async_trait::async_trait]
impl Runnable for RenderArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
