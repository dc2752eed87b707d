//! File scanning with gitignore support

use crate::domain::Config;
use anyhow::Result;
use std::path::Path;

pub mod scanner;

pub use scanner::{FileScanner, RepoFile, ScanStats};

pub fn scan_repository(root: &Path, config: &Config) -> Result<(Vec<RepoFile>, ScanStats)> {
    let mut scanner =
        FileScanner::from_config(root.to_path_buf(), &config.scan, config.limits.max_file_size);
    let files = scanner.scan()?;
    Ok((files, scanner.stats().clone()))
}
