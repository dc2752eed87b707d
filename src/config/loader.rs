//! Config file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::{Figment, Provider};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides, e.g. `DIFF_CONTEXT_LIMITS__MAX_FRAGMENTS=50`.
pub const ENV_PREFIX: &str = "DIFF_CONTEXT_";

const NESTED_SECTION: &str = "diff-context";

const DISCOVERY_NAMES: &[&str] = &[
    "diff-context.toml",
    ".diff-context.toml",
    "diff-context.yml",
    "diff-context.yaml",
    ".diff-context.yml",
    ".diff-context.yaml",
];

/// Load configuration for `repo_root`: defaults, then the config file (explicit
/// or discovered), then `DIFF_CONTEXT_*` environment overrides.
///
/// A broken explicit file is an error. A broken discovered file is reported
/// and ignored.
pub fn load_config(repo_root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let from_file = load_file_config(repo_root, config_path)?;
    let config = apply_overrides(from_file, Env::prefixed(ENV_PREFIX).split("__"))?;
    config.validate()?;
    Ok(config)
}

fn load_file_config(repo_root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let explicit = config_path.is_some();
    let discovered = config_path.map(Path::to_path_buf).or_else(|| discover_config(repo_root));
    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };
    tracing::debug!("Loading config from {}", config_file.display());

    match parse_config_file(&config_file) {
        Ok(config) => Ok(config),
        Err(e) if explicit => Err(e),
        Err(e) => {
            tracing::warn!(
                "Ignoring auto-discovered config {}: {:#}",
                config_file.display(),
                e
            );
            Ok(Config::default())
        }
    }
}

fn parse_config_file(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;
    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    match ext.as_str() {
        "toml" => parse_toml_config(&content, config_file),
        "yaml" | "yml" => parse_yaml_config(&content, config_file),
        other => anyhow::bail!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        ),
    }
}

/// Parse TOML config, accepting a nested `[diff-context]` section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;
    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };
    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, accepting a nested `diff-context:` mapping.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;
    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };
    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

/// Layer `provider` over `base`; keys it does not set keep their value.
fn apply_overrides(base: Config, provider: impl Provider) -> Result<Config> {
    Figment::from(Serialized::defaults(base))
        .merge(provider)
        .extract()
        .context("Invalid configuration override")
}

fn discover_config(repo_root: &Path) -> Option<PathBuf> {
    DISCOVERY_NAMES.iter().map(|name| repo_root.join(name)).find(|path| path.is_file())
}
