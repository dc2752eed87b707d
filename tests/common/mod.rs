//! Throwaway git repositories for integration tests.

#![allow(dead_code)]

use git2::{IndexAddOption, Oid, Repository, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tmp");
        let repo = Repository::init(dir.path()).expect("init");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.dir.path().join(rel)).expect("remove");
    }

    /// Stage everything, deletions included, and commit on HEAD.
    pub fn commit(&self, message: &str) -> Oid {
        let mut index = self.repo.index().expect("index");
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).expect("add");
        index.update_all(["*"].iter(), None).expect("update");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("tree");
        let tree = self.repo.find_tree(tree_id).expect("find tree");
        let sig = Signature::now("Test", "test@example.com").expect("sig");
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).expect("commit")
    }
}

/// A tax module, its caller, its test and an unrelated file; the last commit
/// changes only the tax module.
pub fn tax_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.write("src/__init__.py", "");
    repo.write(
        "src/tax.py",
        "def calculate_tax(amount, rate):\n    return amount * rate\n",
    );
    repo.write(
        "src/checkout.py",
        "from src.tax import calculate_tax\n\n\ndef checkout_total(subtotal):\n    \
         return subtotal + calculate_tax(subtotal, 0.2)\n",
    );
    repo.write(
        "tests/test_tax.py",
        "from src.tax import calculate_tax\n\n\ndef test_calculate_tax():\n    \
         assert calculate_tax(100, 0.2) == 20\n",
    );
    repo.write(
        "src/garbage.py",
        "def format_banner(text):\n    return text.upper()\n\n\ndef unrelated_helper():\n    \
         return 42\n",
    );
    repo.commit("initial");

    repo.write(
        "src/tax.py",
        "def calculate_tax(amount, rate):\n    return round(amount * rate, 2)\n",
    );
    repo.commit("round tax");
    repo
}
