//! Errors surfaced to callers of the engine.
//!
//! Only input problems are errors. Unreadable files, unparseable sources and
//! truncated history walks degrade the context instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("not a git working tree: {path}")]
    RepositoryNotFound {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("repository at {0} has no working directory")]
    BareRepository(PathBuf),

    #[error("invalid diff range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("token budget must be a positive integer")]
    InvalidBudget,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to scan working tree: {0:#}")]
    Scan(anyhow::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;
