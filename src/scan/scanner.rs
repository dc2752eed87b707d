//! Repository file discovery with gitignore support

use crate::domain::config::DEFAULT_MAX_FILE_SIZE;
use crate::domain::ScanConfig;
use crate::utils::{is_noise_path, paths::relative_to};
use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const KNOWN_EXTENSIONLESS: &[&str] =
    &["makefile", "dockerfile", "rakefile", "gemfile", "procfile", "vagrantfile", "jenkinsfile"];

/// A candidate file discovered in the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_included: usize,
    pub files_skipped_glob: usize,
    pub files_skipped_extension: usize,
    pub files_skipped_size: usize,
    pub files_skipped_noise: usize,
}

/// Walks a working tree and returns candidate files in sorted order.
pub struct FileScanner {
    root_path: PathBuf,
    include_extensions: Vec<String>,
    exclude_globs: Vec<String>,
    max_file_bytes: u64,
    respect_gitignore: bool,
    follow_symlinks: bool,
    stats: ScanStats,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self::from_config(root_path, &ScanConfig::default(), DEFAULT_MAX_FILE_SIZE)
    }

    pub fn from_config(root_path: PathBuf, cfg: &ScanConfig, max_file_bytes: u64) -> Self {
        Self {
            root_path,
            include_extensions: cfg.include_extensions.clone(),
            exclude_globs: cfg.exclude_globs.clone(),
            max_file_bytes,
            respect_gitignore: cfg.respect_gitignore,
            follow_symlinks: cfg.follow_symlinks,
            stats: ScanStats::default(),
        }
    }

    pub fn include_extensions(mut self, extensions: Vec<String>) -> Self {
        self.include_extensions = extensions;
        self
    }

    pub fn max_file_bytes(mut self, max_bytes: u64) -> Self {
        self.max_file_bytes = max_bytes;
        self
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_globs {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Ignoring invalid exclude glob '{}': {}", pattern, e),
            }
        }
        Ok(builder.build()?)
    }

    fn should_include_extension(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();

        if ext.is_empty() {
            return KNOWN_EXTENSIONLESS.contains(&name.as_str());
        }
        self.include_extensions.contains(&format!(".{ext}"))
    }

    /// Scan the working tree. Results are sorted by relative path.
    pub fn scan(&mut self) -> Result<Vec<RepoFile>> {
        self.stats = ScanStats::default();
        let exclude_globset = self.build_exclude_globset()?;

        let mut builder = WalkBuilder::new(&self.root_path);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(self.follow_symlinks)
            .hidden(false)
            .parents(true)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir {
                    return true;
                }
                match entry.file_name().to_str() {
                    Some("node_modules" | "__pycache__" | ".git" | ".venv" | "venv") => false,
                    Some(name) => !(name.starts_with('.') && name != ".github"),
                    None => true,
                }
            });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            self.stats.files_scanned += 1;

            let path = entry.path();
            let Some(rel_path) = relative_to(&self.root_path, path) else {
                continue;
            };

            if exclude_globset.is_match(&rel_path) {
                self.stats.files_skipped_glob += 1;
                continue;
            }
            if !self.should_include_extension(path) {
                self.stats.files_skipped_extension += 1;
                continue;
            }
            if is_noise_path(&rel_path) {
                self.stats.files_skipped_noise += 1;
                continue;
            }
            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(_) => continue,
            };
            if size > self.max_file_bytes {
                self.stats.files_skipped_size += 1;
                continue;
            }

            files.push(RepoFile {
                path: path.to_path_buf(),
                relative_path: rel_path,
                size_bytes: size,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        self.stats.files_included = files.len();
        Ok(files)
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scanner_finds_code_and_config_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("infra")).unwrap();
        fs::write(root.join("b.py"), "print('b')").unwrap();
        fs::write(root.join("a.rs"), "fn main() {}").unwrap();
        fs::write(root.join("infra/main.tf"), "resource \"x\" \"y\" {}").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();

        let mut scanner = FileScanner::new(root.to_path_buf());
        let files = scanner.scan().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(paths, vec!["a.rs", "b.py", "infra/main.tf"]);
        assert_eq!(scanner.stats().files_skipped_extension, 1);
    }

    #[test]
    fn scanner_respects_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("large.rs"), "a".repeat(2_000)).unwrap();
        fs::write(root.join("small.rs"), "fn main() {}").unwrap();

        let mut scanner = FileScanner::new(root.to_path_buf()).max_file_bytes(1_000);
        let files = scanner.scan().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "small.rs");
        assert_eq!(scanner.stats().files_skipped_size, 1);
    }

    #[test]
    fn scanner_respects_gitignore_without_git_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".gitignore"), "generated.py\n").unwrap();
        fs::write(root.join("generated.py"), "x = 1").unwrap();
        fs::write(root.join("kept.py"), "y = 2").unwrap();

        let mut scanner = FileScanner::new(root.to_path_buf());
        let files = scanner.scan().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["kept.py"]);
    }

    #[test]
    fn noise_dirs_and_lock_files_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for noise_dir in ["node_modules", "__pycache__", ".venv", ".cache"] {
            fs::create_dir_all(root.join(noise_dir)).unwrap();
            fs::write(root.join(noise_dir).join("file.py"), "# noise").unwrap();
        }
        fs::create_dir_all(root.join(".github/workflows")).unwrap();
        fs::write(root.join(".github/workflows/ci.yml"), "on: push").unwrap();
        fs::write(root.join("package-lock.json"), "{}").unwrap();
        fs::write(root.join("main.py"), "print('hello')").unwrap();

        let mut scanner = FileScanner::new(root.to_path_buf()).respect_gitignore(false);
        let files = scanner.scan().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(paths, vec![".github/workflows/ci.yml", "main.py"]);
    }

    #[test]
    fn extension_filter_is_configurable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("test.rs"), "fn main() {}").unwrap();
        fs::write(root.join("test.py"), "pass").unwrap();

        let mut scanner =
            FileScanner::new(root.to_path_buf()).include_extensions(vec![".rs".to_string()]);
        let files = scanner.scan().unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].relative_path.ends_with("test.rs"));
    }
}
