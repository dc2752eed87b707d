//! Diff reader: revision range to [`ChangeSet`].

use crate::domain::{ChangeSet, ChangeStatus, FileChange, Hunk, LineRange, RevisionPoint};
use crate::error::{ContextError, Result};
use crate::utils::normalize_path;
use git2::{Commit, Delta, Diff, DiffOptions, Patch, Repository};

pub const WORKING_TREE: &str = "WORKTREE";

/// Parsed form of a revision range expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// `base..head`: tree of `base` against tree of `head`.
    Between { base: String, head: String },
    /// `base...head`: merge base of both against `head`.
    MergeBase { base: String, head: String },
    /// A single revision against the working tree (index included).
    WorkingTree { base: String },
}

pub fn parse_range(range: &str) -> Result<RangeSpec> {
    let trimmed = range.trim();
    if trimmed.is_empty() {
        return Err(invalid(range, "range is empty"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid(range, "range must not contain whitespace"));
    }

    let side = |s: &str| if s.is_empty() { "HEAD".to_string() } else { s.to_string() };

    if let Some((base, head)) = trimmed.split_once("...") {
        if head.contains("..") {
            return Err(invalid(range, "more than one range operator"));
        }
        return Ok(RangeSpec::MergeBase { base: side(base), head: side(head) });
    }
    if let Some((base, head)) = trimmed.split_once("..") {
        if head.contains("..") {
            return Err(invalid(range, "more than one range operator"));
        }
        if base.is_empty() && head.is_empty() {
            return Err(invalid(range, "range has no endpoints"));
        }
        return Ok(RangeSpec::Between { base: side(base), head: side(head) });
    }
    Ok(RangeSpec::WorkingTree { base: trimmed.to_string() })
}

/// Read the files changed in `range`, sorted by path, with their hunks.
pub fn read_diff(repo: &Repository, range: &str) -> Result<ChangeSet> {
    let spec = parse_range(range)?;
    tracing::debug!("Reading diff for {:?}", spec);

    let (base, head, diff) = match &spec {
        RangeSpec::Between { base, head } => {
            let base_commit = resolve_commit(repo, range, base)?;
            let head_commit = resolve_commit(repo, range, head)?;
            let diff = tree_diff(repo, &base_commit, &head_commit)?;
            (point(base, &base_commit), point(head, &head_commit), diff)
        }
        RangeSpec::MergeBase { base, head } => {
            let base_commit = resolve_commit(repo, range, base)?;
            let head_commit = resolve_commit(repo, range, head)?;
            let merge_base = repo
                .merge_base(base_commit.id(), head_commit.id())
                .map_err(|e| invalid(range, &format!("no merge base: {}", e.message())))?;
            let merge_commit = repo.find_commit(merge_base)?;
            let diff = tree_diff(repo, &merge_commit, &head_commit)?;
            (point(base, &merge_commit), point(head, &head_commit), diff)
        }
        RangeSpec::WorkingTree { base } => {
            let base_commit = resolve_commit(repo, range, base)?;
            let tree = base_commit.tree()?;
            let mut opts = DiffOptions::new();
            opts.include_untracked(true).recurse_untracked_dirs(true).show_untracked_content(true);
            let diff = repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;
            let head = RevisionPoint { spec: WORKING_TREE.to_string(), commit: None };
            (point(base, &base_commit), head, diff)
        }
    };

    let files = collect_changes(diff)?;
    tracing::info!("Diff {} touches {} file(s)", range, files.len());
    Ok(ChangeSet { base, head, files })
}

fn invalid(range: &str, reason: &str) -> ContextError {
    ContextError::InvalidRange { range: range.to_string(), reason: reason.to_string() }
}

fn resolve_commit<'r>(repo: &'r Repository, range: &str, rev: &str) -> Result<Commit<'r>> {
    let object = repo
        .revparse_single(rev)
        .map_err(|e| invalid(range, &format!("cannot resolve '{rev}': {}", e.message())))?;
    object
        .peel_to_commit()
        .map_err(|e| invalid(range, &format!("'{rev}' is not a commit: {}", e.message())))
}

fn point(spec: &str, commit: &Commit<'_>) -> RevisionPoint {
    RevisionPoint { spec: spec.to_string(), commit: Some(commit.id().to_string()) }
}

fn tree_diff<'r>(repo: &'r Repository, base: &Commit<'r>, head: &Commit<'r>) -> Result<Diff<'r>> {
    let base_tree = base.tree()?;
    let head_tree = head.tree()?;
    Ok(repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), None)?)
}

fn collect_changes(mut diff: Diff<'_>) -> Result<Vec<FileChange>> {
    diff.find_similar(None)?;

    let mut files = Vec::new();
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let status = match delta.status() {
            Delta::Added | Delta::Untracked | Delta::Copied => ChangeStatus::Added,
            Delta::Deleted => ChangeStatus::Deleted,
            Delta::Renamed => ChangeStatus::Renamed,
            Delta::Modified | Delta::Typechange => ChangeStatus::Modified,
            _ => continue,
        };
        let new_path = delta.new_file().path().and_then(|p| p.to_str());
        let old_path = delta.old_file().path().and_then(|p| p.to_str());
        let Some(path) = new_path.or(old_path).map(normalize_path) else {
            tracing::debug!("Skipping delta {} with a non UTF-8 path", idx);
            continue;
        };
        let old_path = old_path.map(normalize_path).filter(|old| *old != path);

        let patch = Patch::from_diff(&diff, idx)?;
        let binary = delta.flags().is_binary()
            || patch.as_ref().map_or(true, |p| p.delta().flags().is_binary());
        let hunks = match &patch {
            Some(patch) if !binary => patch_hunks(patch)?,
            _ => Vec::new(),
        };

        files.push(FileChange { path, old_path, status, binary, hunks });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

fn patch_hunks(patch: &Patch<'_>) -> Result<Vec<Hunk>> {
    let mut hunks = Vec::with_capacity(patch.num_hunks());
    for hunk_idx in 0..patch.num_hunks() {
        let (hunk, line_count) = patch.hunk(hunk_idx)?;
        let mut text = String::from_utf8_lossy(hunk.header()).into_owned();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        for line_idx in 0..line_count {
            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
            let origin = line.origin();
            if !matches!(origin, '+' | '-' | ' ') {
                continue;
            }
            text.push(origin);
            text.push_str(&String::from_utf8_lossy(line.content()));
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
        hunks.push(Hunk {
            old: LineRange { start: hunk.old_start(), count: hunk.old_lines() },
            new: LineRange { start: hunk.new_start(), count: hunk.new_lines() },
            text,
        });
    }
    Ok(hunks)
}
