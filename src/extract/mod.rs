//! Per-file symbol extraction.
//!
//! Extraction is best-effort: an extractor never fails, unparseable input
//! yields an empty [`SemanticInfo`].

use crate::domain::{SemanticInfo, SourceFile};
use rayon::prelude::*;

pub mod heuristic;
pub mod tree_sitter;

/// Capability interface implemented once per language family.
pub trait SemanticExtractor: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &str, content: &str) -> SemanticInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Other,
}

impl Language {
    pub fn detect(path: &str) -> Self {
        match crate::utils::paths::extension_of(path).as_deref() {
            Some("py" | "pyi") => Language::Python,
            Some("rs") => Language::Rust,
            Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
            Some("ts" | "mts" | "cts") => Language::TypeScript,
            Some("tsx") => Language::Tsx,
            Some("go") => Language::Go,
            _ => Language::Other,
        }
    }

    /// Languages whose import/export statements link files directly.
    pub fn is_module_based(self) -> bool {
        matches!(
            self,
            Language::Python | Language::JavaScript | Language::TypeScript | Language::Tsx
        )
    }
}

/// Tree-sitter for supported languages, regex heuristics for everything else
/// and for sources tree-sitter cannot parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl SemanticExtractor for DefaultExtractor {
    fn name(&self) -> &'static str {
        "tree-sitter+heuristic"
    }

    fn extract(&self, path: &str, content: &str) -> SemanticInfo {
        let language = Language::detect(path);
        if let Some(info) = tree_sitter::extract(language, content) {
            return info;
        }
        heuristic::extract(path, content)
    }
}

/// Extract every file in parallel. Output order matches `files`.
pub fn extract_all(extractor: &dyn SemanticExtractor, files: &[SourceFile]) -> Vec<SemanticInfo> {
    files.par_iter().map(|file| extractor.extract(&file.path, &file.content)).collect()
}
