//! Engine configuration.
//!
//! Every tunable is a named default below; a `Config` is an immutable value
//! handed to each component constructor.

use crate::error::ContextError;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100_000;
pub const DEFAULT_MAX_FRAGMENTS: usize = 200;
pub const DEFAULT_RARE_IDENTIFIER_THRESHOLD: usize = 3;
pub const DEFAULT_MAX_EXPANSION_FILES: usize = 20;
pub const DEFAULT_OVERHEAD_PER_FRAGMENT: usize = 18;
pub const DEFAULT_BUDGET_TOKENS: usize = 50_000;

pub const DEFAULT_PPR_ALPHA: f64 = 0.60;
pub const DEFAULT_PPR_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_PPR_MAX_ITERATIONS: usize = 50;

pub const DEFAULT_LEXICAL_MIN_SIMILARITY: f64 = 0.10;
pub const DEFAULT_LEXICAL_HUB_PERCENTILE: f64 = 0.95;
pub const DEFAULT_LEXICAL_TOP_K_NEIGHBORS: usize = 10;
pub const DEFAULT_LEXICAL_MAX_DF_RATIO: f64 = 0.20;
pub const DEFAULT_LEXICAL_MIN_IDF: f64 = 1.6;
pub const DEFAULT_LEXICAL_MAX_POSTINGS: usize = 200;
pub const DEFAULT_LEXICAL_WEIGHT_MIN: f64 = 0.1;
pub const DEFAULT_LEXICAL_WEIGHT_MAX: f64 = 0.2;
pub const DEFAULT_LEXICAL_BACKWARD_FACTOR: f64 = 0.7;
pub const DEFAULT_LEXICAL_RARE_BOOST: f64 = 2.0;
pub const DEFAULT_LEXICAL_MIN_TERM_LEN: usize = 3;

pub const DEFAULT_COCHANGE_WEIGHT: f64 = 0.40;
pub const DEFAULT_COCHANGE_MIN_COUNT: usize = 2;
pub const DEFAULT_COCHANGE_MAX_FILES_PER_COMMIT: usize = 30;
pub const DEFAULT_COCHANGE_COMMITS_LIMIT: usize = 500;
pub const DEFAULT_COCHANGE_TIMEOUT_SECONDS: u64 = 10;

pub const DEFAULT_SIBLING_MAX_FILES_PER_DIR: usize = 20;
pub const DEFAULT_SIBLING_EDGE_WEIGHT: f64 = 0.05;

pub const DEFAULT_GRAPH_SYMBOL_WEIGHT: f64 = 0.25;
pub const DEFAULT_GRAPH_MAX_SYMBOLS_PER_EDGE: usize = 4;
pub const DEFAULT_GRAPH_BACKWARD_FACTOR: f64 = 0.7;
pub const DEFAULT_GRAPH_IMPORT_WEIGHT: f64 = 1.0;
pub const DEFAULT_GRAPH_MAX_DEFINITIONS_PER_SYMBOL: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub ppr: PprConfig,
    pub lexical: LexicalConfig,
    pub cochange: CochangeConfig,
    pub sibling: SiblingConfig,
    pub graph: GraphConfig,
    pub assemble: AssembleConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Bytes; larger files are never expanded into the context.
    pub max_file_size: u64,
    pub max_fragments: usize,
    pub rare_identifier_threshold: usize,
    pub max_expansion_files: usize,
    pub overhead_per_fragment: usize,
    pub default_budget_tokens: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_fragments: DEFAULT_MAX_FRAGMENTS,
            rare_identifier_threshold: DEFAULT_RARE_IDENTIFIER_THRESHOLD,
            max_expansion_files: DEFAULT_MAX_EXPANSION_FILES,
            overhead_per_fragment: DEFAULT_OVERHEAD_PER_FRAGMENT,
            default_budget_tokens: DEFAULT_BUDGET_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PprConfig {
    /// Walk-continuation probability; `1 - alpha` teleports back to the seeds.
    pub alpha: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PprConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_PPR_ALPHA,
            tolerance: DEFAULT_PPR_TOLERANCE,
            max_iterations: DEFAULT_PPR_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub min_similarity: f64,
    pub hub_percentile: f64,
    pub top_k_neighbors: usize,
    pub max_df_ratio: f64,
    pub min_idf: f64,
    pub max_postings: usize,
    pub weight_min: f64,
    pub weight_max: f64,
    pub backward_factor: f64,
    /// Multiplier applied to rare identifiers.
    pub rare_boost: f64,
    pub min_term_len: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_LEXICAL_MIN_SIMILARITY,
            hub_percentile: DEFAULT_LEXICAL_HUB_PERCENTILE,
            top_k_neighbors: DEFAULT_LEXICAL_TOP_K_NEIGHBORS,
            max_df_ratio: DEFAULT_LEXICAL_MAX_DF_RATIO,
            min_idf: DEFAULT_LEXICAL_MIN_IDF,
            max_postings: DEFAULT_LEXICAL_MAX_POSTINGS,
            weight_min: DEFAULT_LEXICAL_WEIGHT_MIN,
            weight_max: DEFAULT_LEXICAL_WEIGHT_MAX,
            backward_factor: DEFAULT_LEXICAL_BACKWARD_FACTOR,
            rare_boost: DEFAULT_LEXICAL_RARE_BOOST,
            min_term_len: DEFAULT_LEXICAL_MIN_TERM_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CochangeConfig {
    pub weight: f64,
    pub min_count: usize,
    pub max_files_per_commit: usize,
    pub commits_limit: usize,
    pub timeout_seconds: u64,
}

impl Default for CochangeConfig {
    fn default() -> Self {
        Self {
            weight: DEFAULT_COCHANGE_WEIGHT,
            min_count: DEFAULT_COCHANGE_MIN_COUNT,
            max_files_per_commit: DEFAULT_COCHANGE_MAX_FILES_PER_COMMIT,
            commits_limit: DEFAULT_COCHANGE_COMMITS_LIMIT,
            timeout_seconds: DEFAULT_COCHANGE_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiblingConfig {
    pub max_files_per_dir: usize,
    /// Extensions (no dot) whose directory layout carries meaning.
    #[serde(deserialize_with = "string_or_list")]
    pub extensions: Vec<String>,
    /// Extensionless file names treated the same way (lowercase).
    #[serde(deserialize_with = "string_or_list")]
    pub file_names: Vec<String>,
    pub edge_weight: f64,
}

impl Default for SiblingConfig {
    fn default() -> Self {
        Self {
            max_files_per_dir: DEFAULT_SIBLING_MAX_FILES_PER_DIR,
            extensions: [
                "tf", "tfvars", "hcl", "yaml", "yml", "json", "toml", "ini", "cfg", "conf",
                "properties", "env", "proto", "sql", "xml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            file_names: ["dockerfile", "makefile", "procfile", "jenkinsfile"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            edge_weight: DEFAULT_SIBLING_EDGE_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Weight contributed by each distinct connecting symbol.
    pub symbol_weight: f64,
    pub max_symbols_per_edge: usize,
    /// Caller-direction discount, strictly below 1.
    pub backward_factor: f64,
    pub import_weight: f64,
    /// Symbols defined in more files than this are too ambiguous to link.
    pub max_definitions_per_symbol: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            symbol_weight: DEFAULT_GRAPH_SYMBOL_WEIGHT,
            max_symbols_per_edge: DEFAULT_GRAPH_MAX_SYMBOLS_PER_EDGE,
            backward_factor: DEFAULT_GRAPH_BACKWARD_FACTOR,
            import_weight: DEFAULT_GRAPH_IMPORT_WEIGHT,
            max_definitions_per_symbol: DEFAULT_GRAPH_MAX_DEFINITIONS_PER_SYMBOL,
        }
    }
}

/// How signals are combined into one composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FusionStrategy {
    #[default]
    Sum,
    Weighted {
        ppr: f64,
        lexical: f64,
        cochange: f64,
    },
    Max,
}

/// What a changed file contributes as its mandatory fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeedContent {
    #[default]
    Hunks,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssembleConfig {
    pub fusion: FusionStrategy,
    pub seed_content: SeedContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    #[serde(deserialize_with = "extensions_or_list")]
    pub include_extensions: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub exclude_globs: Vec<String>,
    pub respect_gitignore: bool,
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_extensions: default_include_extensions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_globs: default_exclude_globs().iter().map(|s| s.to_string()).collect(),
            respect_gitignore: true,
            follow_symlinks: false,
        }
    }
}

pub fn default_include_extensions() -> &'static [&'static str] {
    &[
        ".py", ".pyi", ".rs", ".go", ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".java",
        ".kt", ".scala", ".c", ".h", ".cc", ".cpp", ".hpp", ".cs", ".rb", ".php", ".swift",
        ".sh", ".bash", ".sql", ".proto", ".graphql", ".tf", ".tfvars", ".hcl", ".yaml", ".yml",
        ".json", ".toml", ".ini", ".cfg", ".conf", ".properties", ".env", ".xml", ".gradle",
        ".md", ".rst", ".txt",
    ]
}

pub fn default_exclude_globs() -> &'static [&'static str] {
    &[
        "**/node_modules/**",
        "**/vendor/**",
        "**/dist/**",
        "**/target/**",
        "**/*.lock",
        "**/package-lock.json",
        "**/*.min.js",
    ]
}

impl Config {
    pub fn overhead(&self) -> usize {
        self.limits.overhead_per_fragment
    }

    /// Reject values that would break ranking or budgeting invariants.
    pub fn validate(&self) -> Result<(), ContextError> {
        let mut problems = Vec::new();

        if self.limits.max_fragments == 0 {
            problems.push("limits.max_fragments must be at least 1".to_string());
        }
        if self.limits.default_budget_tokens == 0 {
            problems.push("limits.default_budget_tokens must be positive".to_string());
        }
        if !(self.ppr.alpha > 0.0 && self.ppr.alpha < 1.0) {
            problems.push(format!("ppr.alpha must be in (0, 1), got {}", self.ppr.alpha));
        }
        if self.ppr.tolerance <= 0.0 {
            problems.push("ppr.tolerance must be positive".to_string());
        }
        if self.ppr.max_iterations == 0 {
            problems.push("ppr.max_iterations must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.lexical.min_similarity) {
            problems.push("lexical.min_similarity must be in [0, 1]".to_string());
        }
        if !(self.lexical.hub_percentile > 0.0 && self.lexical.hub_percentile <= 1.0) {
            problems.push("lexical.hub_percentile must be in (0, 1]".to_string());
        }
        if !(self.lexical.max_df_ratio > 0.0 && self.lexical.max_df_ratio <= 1.0) {
            problems.push("lexical.max_df_ratio must be in (0, 1]".to_string());
        }
        if self.lexical.weight_min < 0.0 || self.lexical.weight_min > self.lexical.weight_max {
            problems.push("lexical weights must satisfy 0 <= weight_min <= weight_max".to_string());
        }
        if !(0.0..=1.0).contains(&self.lexical.backward_factor) {
            problems.push("lexical.backward_factor must be in [0, 1]".to_string());
        }
        if self.lexical.max_postings == 0 {
            problems.push("lexical.max_postings must be at least 1".to_string());
        }
        if !(0.0..1.0).contains(&self.graph.backward_factor) {
            problems.push("graph.backward_factor must be in [0, 1)".to_string());
        }
        if self.graph.symbol_weight < 0.0 || self.graph.import_weight < 0.0 {
            problems.push("graph weights must be non-negative".to_string());
        }
        if self.cochange.weight < 0.0 {
            problems.push("cochange.weight must be non-negative".to_string());
        }
        if self.cochange.min_count == 0 {
            problems.push("cochange.min_count must be at least 1".to_string());
        }
        if self.sibling.edge_weight < 0.0 {
            problems.push("sibling.edge_weight must be non-negative".to_string());
        }
        if let FusionStrategy::Weighted { ppr, lexical, cochange } = self.assemble.fusion {
            if ppr < 0.0 || lexical < 0.0 || cochange < 0.0 {
                problems.push("assemble.fusion weights must be non-negative".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ContextError::InvalidConfig(problems.join("; ")))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_items(self) -> Vec<String> {
        let raw = match self {
            StringOrList::One(s) => s.split(',').map(str::to_string).collect(),
            StringOrList::Many(v) => v,
        };
        raw.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

/// Accept `"a, b"` or `["a", "b"]`.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrList::deserialize(deserializer)?.into_items())
}

/// Like `string_or_list`, normalizing every entry to a lowercase `.ext`.
fn extensions_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrList::deserialize(deserializer)?
        .into_items()
        .into_iter()
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect())
}
