//! Build command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use super::utils::{parse_csv, spinner};
use crate::config::load_config;
use crate::domain::SeedContent;
use crate::pipeline::ContextEngine;
use crate::render::{render, OutputFormat, RenderOptions};

#[derive(Args)]
pub struct BuildArgs {
    /// Repository working tree
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Revision range: 'A..B', 'A...B' (from the merge base), or a single
    /// revision compared with the working tree
    #[arg(short, long, value_name = "RANGE", default_value = "HEAD")]
    pub range: String,

    /// Token budget (defaults to limits.default_budget_tokens)
    #[arg(short, long, value_name = "TOKENS")]
    pub budget: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to config file (diff-context.toml or .diff-context.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Include only these extensions when scanning (comma-separated, e.g. '.py,.ts')
    #[arg(short = 'i', long, value_name = "EXTS")]
    pub include_ext: Option<String>,

    /// Exclude paths matching these globs (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude_glob: Option<String>,

    /// Ignore .gitignore rules
    #[arg(long)]
    pub no_gitignore: bool,

    /// Use full file content for changed files instead of their hunks
    #[arg(long)]
    pub full_seeds: bool,

    /// Omit the generation timestamp for reproducible output
    #[arg(long)]
    pub no_timestamp: bool,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Cannot access {}", args.path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let mut config = load_config(&root, args.config.as_deref())?;
    if let Some(extensions) = parse_csv(&args.include_ext) {
        config.scan.include_extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
    }
    if let Some(globs) = parse_csv(&args.exclude_glob) {
        config.scan.exclude_globs = globs;
    }
    if args.no_gitignore {
        config.scan.respect_gitignore = false;
    }
    if args.full_seeds {
        config.assemble.seed_content = SeedContent::Full;
    }

    let progress = spinner(&format!("Building context for {}", args.range));
    let result = ContextEngine::new(config).build(&root, &args.range, args.budget);
    progress.finish_and_clear();
    let context = result?;

    let options = RenderOptions { format: args.format, include_timestamp: !args.no_timestamp };
    let rendered = render(&context, options)?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} fragment(s), {} / {} tokens, to {}",
                context.fragment_count,
                context.tokens_used,
                context.budget_tokens,
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
