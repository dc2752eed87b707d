//! Output rendering (JSON, Markdown)

use crate::domain::DiffContext;
use clap::ValueEnum;

pub mod json;
pub mod markdown;

pub use json::render_json;
pub use markdown::render_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub include_timestamp: bool,
}

pub fn render(context: &DiffContext, options: RenderOptions) -> anyhow::Result<String> {
    match options.format {
        OutputFormat::Json => render_json(context, options.include_timestamp),
        OutputFormat::Markdown => Ok(render_markdown(context, options.include_timestamp)),
    }
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}
