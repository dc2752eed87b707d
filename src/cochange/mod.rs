//! Historical co-change mining.
//!
//! Files that repeatedly change in the same commits as a seed are linked to
//! it even when no static relationship exists. The walk is bounded by a
//! commit ceiling and a deadline; a partial walk simply yields fewer edges.

use crate::domain::CochangeConfig;
use crate::git::{HistoricalCommit, HistoryWalker, Truncation};
use crate::graph::{EdgeBuffer, EdgeKind};
use git2::{Oid, Repository};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

/// A seed and a non-seed file that changed together `count` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CochangePair {
    pub seed: String,
    pub other: String,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct CochangeOutcome {
    pub edges: EdgeBuffer,
    pub pairs: Vec<CochangePair>,
    pub commits_walked: usize,
    /// Commits that touched a seed and passed the size filter.
    pub commits_used: usize,
    pub truncated: Option<Truncation>,
}

/// Tally `(seed, other)` co-occurrences. Commits touching no seed, or more
/// than `max_files_per_commit` files, are skipped. Returns the tally and the
/// number of commits that contributed.
pub fn count_pairs(
    commits: impl IntoIterator<Item = HistoricalCommit>,
    seeds: &BTreeSet<String>,
    max_files_per_commit: usize,
) -> (BTreeMap<(String, String), usize>, usize) {
    let mut counts = BTreeMap::new();
    let mut used = 0;
    for commit in commits {
        if commit.files.len() > max_files_per_commit {
            continue;
        }
        let touched: Vec<&String> = commit.files.iter().filter(|f| seeds.contains(*f)).collect();
        if touched.is_empty() {
            continue;
        }
        used += 1;
        for seed in &touched {
            for other in commit.files.iter().filter(|f| !seeds.contains(*f)) {
                *counts.entry(((*seed).clone(), other.clone())).or_insert(0) += 1;
            }
        }
    }
    (counts, used)
}

/// Keep pairs with `count >= min_count` whose other file is a current
/// candidate, and weight them by `weight * count / max_count` in both
/// directions.
pub fn pairs_to_edges(
    counts: BTreeMap<(String, String), usize>,
    candidates: &BTreeSet<String>,
    config: &CochangeConfig,
) -> (Vec<CochangePair>, EdgeBuffer) {
    let pairs: Vec<CochangePair> = counts
        .into_iter()
        .filter(|((_, other), count)| *count >= config.min_count && candidates.contains(other))
        .map(|((seed, other), count)| CochangePair { seed, other, count })
        .collect();

    let mut edges = EdgeBuffer::new();
    let Some(max_count) = pairs.iter().map(|p| p.count).max() else {
        return (pairs, edges);
    };
    for pair in &pairs {
        let weight = config.weight * pair.count as f64 / max_count as f64;
        edges.push(pair.seed.as_str(), pair.other.as_str(), EdgeKind::Cochange, weight);
        edges.push(pair.other.as_str(), pair.seed.as_str(), EdgeKind::Cochange, weight);
    }
    (pairs, edges)
}

/// Mine history starting at `start`. Opens its own repository handle so the
/// walk can run on another thread. Failures degrade to an empty outcome.
pub fn mine_cochange(
    repo_root: &Path,
    start: Option<&str>,
    seeds: &BTreeSet<String>,
    candidates: &BTreeSet<String>,
    config: &CochangeConfig,
) -> CochangeOutcome {
    match try_mine(repo_root, start, seeds, candidates, config) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("Co-change mining skipped: {}", e);
            CochangeOutcome::default()
        }
    }
}

fn try_mine(
    repo_root: &Path,
    start: Option<&str>,
    seeds: &BTreeSet<String>,
    candidates: &BTreeSet<String>,
    config: &CochangeConfig,
) -> anyhow::Result<CochangeOutcome> {
    if seeds.is_empty() || config.commits_limit == 0 {
        return Ok(CochangeOutcome::default());
    }
    let repo = Repository::open(repo_root)?;
    let start = match start {
        Some(id) => Oid::from_str(id)?,
        None => repo.head()?.peel_to_commit()?.id(),
    };

    let timeout = Duration::from_secs(config.timeout_seconds);
    let mut walker = HistoryWalker::new(&repo, start, config.commits_limit, timeout)?;
    let (counts, commits_used) =
        count_pairs(walker.by_ref(), seeds, config.max_files_per_commit);
    let (pairs, edges) = pairs_to_edges(counts, candidates, config);

    if let Some(reason) = walker.truncated() {
        tracing::info!(
            "Co-change walk truncated by {} after {} commit(s)",
            reason.as_str(),
            walker.walked()
        );
    }
    tracing::debug!("Co-change: {} pair(s) from {} commit(s)", pairs.len(), commits_used);

    Ok(CochangeOutcome {
        edges,
        pairs,
        commits_walked: walker.walked(),
        commits_used,
        truncated: walker.truncated(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::{commit_all, write};
    use tempfile::TempDir;

    fn commit(files: &[&str]) -> HistoricalCommit {
        HistoricalCommit { id: String::new(), files: files.iter().map(|f| f.to_string()).collect() }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_only_commits_touching_seeds() {
        let history = vec![
            commit(&["app.py", "test_app.py"]),
            commit(&["app.py", "test_app.py", "README.md"]),
            commit(&["README.md", "docs.md"]),
        ];
        let (counts, used) = count_pairs(history, &set(&["app.py"]), 30);

        assert_eq!(used, 2);
        assert_eq!(counts[&("app.py".to_string(), "test_app.py".to_string())], 2);
        assert_eq!(counts[&("app.py".to_string(), "README.md".to_string())], 1);
        assert!(!counts.contains_key(&("README.md".to_string(), "docs.md".to_string())));
    }

    #[test]
    fn mass_commits_are_ignored() {
        let mut files: Vec<String> = (0..40).map(|i| format!("f{i}.py")).collect();
        files.push("app.py".to_string());
        let history = vec![HistoricalCommit { id: String::new(), files }];
        let (counts, used) = count_pairs(history, &set(&["app.py"]), 30);
        assert!(counts.is_empty());
        assert_eq!(used, 0);
    }

    #[test]
    fn edges_are_normalized_filtered_and_symmetric() {
        let mut counts = BTreeMap::new();
        counts.insert(("app.py".to_string(), "test_app.py".to_string()), 4);
        counts.insert(("app.py".to_string(), "deploy.yaml".to_string()), 2);
        counts.insert(("app.py".to_string(), "once.py".to_string()), 1);
        counts.insert(("app.py".to_string(), "deleted.py".to_string()), 5);
        let config = CochangeConfig::default();
        let candidates = set(&["test_app.py", "deploy.yaml", "once.py"]);

        let (pairs, edges) = pairs_to_edges(counts, &candidates, &config);
        assert_eq!(pairs.len(), 2);
        let weights: BTreeMap<(&str, &str), f64> = edges
            .iter()
            .map(|e| ((e.source.as_str(), e.target.as_str()), e.weight))
            .collect();
        assert_eq!(weights.len(), 4);
        assert!((weights[&("app.py", "test_app.py")] - config.weight).abs() < 1e-12);
        assert!((weights[&("deploy.yaml", "app.py")] - config.weight / 2.0).abs() < 1e-12);
    }

    #[test]
    fn mines_a_real_repository() {
        let temp_dir = TempDir::new().expect("tmp");
        let repo = Repository::init(temp_dir.path()).expect("init");
        for i in 0..3 {
            write(temp_dir.path(), "app.py", &format!("VERSION = {i}\n"));
            write(temp_dir.path(), "test_app.py", &format!("EXPECTED = {i}\n"));
            commit_all(&repo, &format!("release {i}"));
        }
        write(temp_dir.path(), "unrelated.py", "x = 1\n");
        commit_all(&repo, "unrelated");

        let seeds = set(&["app.py"]);
        let candidates = set(&["app.py", "test_app.py", "unrelated.py"]);
        let outcome =
            mine_cochange(temp_dir.path(), None, &seeds, &candidates, &CochangeConfig::default());

        assert_eq!(outcome.commits_walked, 4);
        assert_eq!(outcome.commits_used, 3);
        assert_eq!(outcome.truncated, None);
        assert_eq!(
            outcome.pairs,
            vec![CochangePair {
                seed: "app.py".to_string(),
                other: "test_app.py".to_string(),
                count: 3
            }]
        );
    }

    #[test]
    fn commit_ceiling_bounds_the_walk() {
        let temp_dir = TempDir::new().expect("tmp");
        let repo = Repository::init(temp_dir.path()).expect("init");
        for i in 0..6 {
            write(temp_dir.path(), "app.py", &format!("VERSION = {i}\n"));
            write(temp_dir.path(), "test_app.py", &format!("EXPECTED = {i}\n"));
            commit_all(&repo, &format!("release {i}"));
        }
        let config = CochangeConfig { commits_limit: 2, ..CochangeConfig::default() };
        let seeds = set(&["app.py"]);
        let candidates = set(&["app.py", "test_app.py"]);
        let outcome = mine_cochange(temp_dir.path(), None, &seeds, &candidates, &config);

        assert_eq!(outcome.commits_walked, 2);
        assert_eq!(outcome.truncated, Some(Truncation::CommitLimit));
        assert_eq!(outcome.pairs[0].count, 2);
    }

    #[test]
    fn missing_repository_degrades_to_empty() {
        let temp_dir = TempDir::new().expect("tmp");
        let outcome = mine_cochange(
            temp_dir.path(),
            None,
            &set(&["a.py"]),
            &set(&["b.py"]),
            &CochangeConfig::default(),
        );
        assert!(outcome.edges.is_empty());
        assert_eq!(outcome.commits_walked, 0);
    }
}
