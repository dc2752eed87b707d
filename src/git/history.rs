//! Bounded history iteration for co-change mining.

use crate::error::Result;
use crate::utils::normalize_path;
use git2::{Commit, Oid, Repository, Revwalk, Sort};
use std::iter::Peekable;
use std::time::{Duration, Instant};

/// Files touched by one non-merge commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalCommit {
    pub id: String,
    pub files: Vec<String>,
}

/// Which bound stopped a walk before history ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    CommitLimit,
    Deadline,
}

impl Truncation {
    pub fn as_str(self) -> &'static str {
        match self {
            Truncation::CommitLimit => "commit_limit",
            Truncation::Deadline => "deadline",
        }
    }
}

/// Walks history from a start commit, newest first, yielding the changed files
/// of each non-merge commit. The commit ceiling and the deadline are checked
/// before every step; merge commits count toward the ceiling.
pub struct HistoryWalker<'repo> {
    repo: &'repo Repository,
    revwalk: Peekable<Revwalk<'repo>>,
    max_commits: usize,
    deadline: Option<Instant>,
    walked: usize,
    truncated: Option<Truncation>,
}

impl<'repo> HistoryWalker<'repo> {
    pub fn new(
        repo: &'repo Repository,
        start: Oid,
        max_commits: usize,
        timeout: Duration,
    ) -> Result<Self> {
        // A timeout too large to represent means no deadline at all.
        Self::start(repo, start, max_commits, Instant::now().checked_add(timeout))
    }

    pub fn with_deadline(
        repo: &'repo Repository,
        start: Oid,
        max_commits: usize,
        deadline: Instant,
    ) -> Result<Self> {
        Self::start(repo, start, max_commits, Some(deadline))
    }

    fn start(
        repo: &'repo Repository,
        start: Oid,
        max_commits: usize,
        deadline: Option<Instant>,
    ) -> Result<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(start)?;
        Ok(Self {
            repo,
            revwalk: revwalk.peekable(),
            max_commits,
            deadline,
            walked: 0,
            truncated: None,
        })
    }

    /// Commits visited so far, merges included.
    pub fn walked(&self) -> usize {
        self.walked
    }

    pub fn truncated(&self) -> Option<Truncation> {
        self.truncated
    }
}

impl Iterator for HistoryWalker<'_> {
    type Item = HistoricalCommit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.truncated.is_some() {
                return None;
            }
            if self.walked >= self.max_commits {
                if self.revwalk.peek().is_some() {
                    self.truncated = Some(Truncation::CommitLimit);
                }
                return None;
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.truncated = Some(Truncation::Deadline);
                return None;
            }

            let oid = match self.revwalk.next()? {
                Ok(oid) => oid,
                Err(e) => {
                    tracing::debug!("History walk error: {}", e);
                    continue;
                }
            };
            self.walked += 1;

            let commit = match self.repo.find_commit(oid) {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::debug!("Skipping unreadable commit {}: {}", oid, e);
                    continue;
                }
            };
            if commit.parent_count() > 1 {
                continue;
            }
            match changed_files(self.repo, &commit) {
                Ok(files) => return Some(HistoricalCommit { id: oid.to_string(), files }),
                Err(e) => tracing::debug!("Skipping commit {} with unreadable diff: {}", oid, e),
            }
        }
    }
}

fn changed_files(repo: &Repository, commit: &Commit<'_>) -> Result<Vec<String>> {
    let tree = commit.tree()?;
    let parent_tree =
        if commit.parent_count() > 0 { Some(commit.parent(0)?.tree()?) } else { None };
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

    let mut files: Vec<String> = diff
        .deltas()
        .filter_map(|delta| {
            delta.new_file().path().or_else(|| delta.old_file().path()).and_then(|p| p.to_str())
        })
        .map(normalize_path)
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}
