//! Git access: the diff under analysis and bounded history walks.

use crate::error::{ContextError, Result};
use git2::Repository;
use std::path::{Path, PathBuf};

pub mod diff;
pub mod history;

pub use diff::{parse_range, read_diff, RangeSpec};
pub use history::{HistoricalCommit, HistoryWalker, Truncation};

/// Discover the repository containing `root`. Bare repositories are rejected
/// because candidate files are read from the working tree.
pub fn open_repository(root: &Path) -> Result<Repository> {
    let repo = Repository::discover(root).map_err(|source| ContextError::RepositoryNotFound {
        path: root.to_path_buf(),
        source,
    })?;
    if repo.is_bare() {
        return Err(ContextError::BareRepository(root.to_path_buf()));
    }
    Ok(repo)
}

/// Working directory of a non-bare repository.
pub fn workdir(repo: &Repository) -> Result<PathBuf> {
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| ContextError::BareRepository(repo.path().to_path_buf()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use git2::{IndexAddOption, Oid, Repository, Signature};
    use std::path::Path;

    pub fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write");
    }

    /// Stage every change in the working tree (deletions included) and commit.
    pub fn commit_all(repo: &Repository, message: &str) -> Oid {
        let mut index = repo.index().expect("index");
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).expect("add");
        index.update_all(["*"].iter(), None).expect("update");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = Signature::now("Test", "test@example.com").expect("sig");
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).expect("commit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_directory_is_not_a_repository() {
        let temp_dir = TempDir::new().expect("tmp");
        let result = open_repository(temp_dir.path());
        assert!(matches!(result, Err(ContextError::RepositoryNotFound { .. })));
    }

    #[test]
    fn discovers_repository_from_subdirectory() {
        let temp_dir = TempDir::new().expect("tmp");
        Repository::init(temp_dir.path()).expect("init");
        std::fs::create_dir_all(temp_dir.path().join("src/deep")).expect("mkdir");

        let repo = open_repository(&temp_dir.path().join("src/deep")).expect("discover");
        let root = workdir(&repo).expect("workdir");
        assert_eq!(
            root.canonicalize().expect("canon"),
            temp_dir.path().canonicalize().expect("canon")
        );
    }

    #[test]
    fn bare_repository_is_rejected() {
        let temp_dir = TempDir::new().expect("tmp");
        Repository::init_bare(temp_dir.path()).expect("init bare");
        let result = open_repository(temp_dir.path());
        assert!(matches!(result, Err(ContextError::BareRepository(_))));
    }
}
