//! diff-context: bounded, relevance-ranked context for a git diff
//!
//! The changed files of a revision range are the seeds. Related files are
//! found through symbol references, imports, lexical similarity, co-change
//! history and directory conventions, ranked with personalized PageRank and
//! packed into a token budget.

pub mod assemble;
pub mod cli;
pub mod cochange;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod git;
pub mod graph;
pub mod lexical;
pub mod pipeline;
pub mod rank;
pub mod render;
pub mod scan;
pub mod sibling;
pub mod utils;

pub use domain::{Config, DiffContext, Fragment, FragmentKind};
pub use error::{ContextError, Result};
pub use extract::SemanticExtractor;
pub use pipeline::{build_diff_context, ContextEngine};
pub use utils::TokenCounter;
