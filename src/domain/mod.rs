//! Core data model shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub mod config;

pub use config::{
    AssembleConfig, CochangeConfig, Config, FusionStrategy, GraphConfig, LexicalConfig,
    LimitsConfig, PprConfig, ScanConfig, SeedContent, SiblingConfig,
};

/// Symbol facts extracted from a single file.
///
/// All sets hold plain symbol names. `module` is populated only for
/// module-based languages (JavaScript, TypeScript, Python) where import and
/// export statements link files directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticInfo {
    pub defines: BTreeSet<String>,
    pub references: BTreeSet<String>,
    pub calls: BTreeSet<String>,
    pub type_refs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleFacts>,
}

/// Import/export facts of a module-based file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFacts {
    /// Raw import specifiers (`./utils/math`, `utils.math`, `react`).
    pub imports: BTreeSet<String>,
    /// Exported symbol names.
    pub exports: BTreeSet<String>,
}

impl SemanticInfo {
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
            && self.references.is_empty()
            && self.calls.is_empty()
            && self.type_refs.is_empty()
            && self.module.as_ref().map_or(true, |m| m.imports.is_empty() && m.exports.is_empty())
    }

    /// Names this file makes available to others: definitions plus exports.
    pub fn provided_symbols(&self) -> impl Iterator<Item = &String> {
        self.defines
            .iter()
            .chain(self.module.iter().flat_map(|m| m.exports.iter()))
    }

    pub fn imports(&self) -> impl Iterator<Item = &String> {
        self.module.iter().flat_map(|m| m.imports.iter())
    }
}

/// Decoded text of one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative, forward-slash path.
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }
}

/// How a file changed within the analysed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// Inclusive 1-based line span. `count == 0` means an empty span at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub count: u32,
}

impl LineRange {
    pub fn end(&self) -> u32 {
        if self.count == 0 {
            self.start
        } else {
            self.start + self.count - 1
        }
    }
}

/// One unified-diff hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old: LineRange,
    pub new: LineRange,
    /// Hunk body including the `@@ .. @@` header, `+`/`-`/` ` prefixed lines.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FileChange {
    pub fn added_ranges(&self) -> impl Iterator<Item = LineRange> + '_ {
        self.hunks.iter().map(|h| h.new).filter(|r| r.count > 0)
    }

    pub fn removed_ranges(&self) -> impl Iterator<Item = LineRange> + '_ {
        self.hunks.iter().map(|h| h.old).filter(|r| r.count > 0)
    }

    /// Concatenated hunk text, or `None` when git produced no textual patch.
    pub fn patch_text(&self) -> Option<String> {
        if self.binary || self.hunks.is_empty() {
            return None;
        }
        let mut out = String::new();
        for hunk in &self.hunks {
            out.push_str(&hunk.text);
            if !hunk.text.ends_with('\n') {
                out.push('\n');
            }
        }
        Some(out)
    }
}

/// A resolved end of the analysed range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPoint {
    /// What the caller wrote (`HEAD~1`, `main`).
    pub spec: String,
    /// Resolved commit id; `None` for the working tree.
    pub commit: Option<String>,
}

/// The diff under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub base: RevisionPoint,
    pub head: RevisionPoint,
    /// Sorted by path, one entry per changed file.
    pub files: Vec<FileChange>,
}

impl ChangeSet {
    pub fn seed_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn get(&self, path: &str) -> Option<&FileChange> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Diff hunks of a changed file.
    SeedHunks,
    /// Full current content of a changed file.
    SeedFile,
    /// Stand-in for a changed file that could not be read.
    Placeholder,
    /// A related, non-changed file.
    Expansion,
}

impl FragmentKind {
    pub fn is_seed(self) -> bool {
        !matches!(self, FragmentKind::Expansion)
    }
}

/// One selected unit of context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub path: String,
    pub content: String,
    pub kind: FragmentKind,
    /// Composite relevance; seeds carry 1.0.
    pub score: f64,
    /// Estimated cost including per-fragment overhead.
    pub tokens: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Per-run counters reported alongside the fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextStats {
    pub seed_count: usize,
    pub files_scanned: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub lexical_edges: usize,
    /// Terms that survived document-frequency and idf filtering.
    pub lexical_terms: usize,
    /// Files whose lexical fan-out made them hubs; edges into them are dropped.
    pub lexical_hubs_suppressed: usize,
    pub cochange_edges: usize,
    /// Seed/file pairs that met `min_count`.
    pub cochange_pairs: usize,
    pub sibling_candidates: usize,
    pub cochange_commits_walked: usize,
    /// Walked commits that touched a seed and passed the size filter.
    pub cochange_commits_used: usize,
    pub cochange_truncated: Option<String>,
    pub ppr_iterations: usize,
    pub ppr_converged: bool,
    pub candidates_considered: usize,
    pub candidates_dropped_unreadable: usize,
    pub candidates_dropped_size: usize,
    /// True only when seed overhead alone exceeds the budget.
    pub seeds_over_budget: bool,
}

/// Final, immutable result of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffContext {
    pub fragments: Vec<Fragment>,
    pub fragment_count: usize,
    pub budget_tokens: usize,
    pub tokens_used: usize,
    pub stats: ContextStats,
}

impl DiffContext {
    pub fn new(fragments: Vec<Fragment>, budget_tokens: usize, stats: ContextStats) -> Self {
        let tokens_used = fragments.iter().map(|f| f.tokens).sum();
        Self { fragment_count: fragments.len(), fragments, budget_tokens, tokens_used, stats }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.path.as_str())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.fragments.iter().any(|f| f.path == path)
    }
}
