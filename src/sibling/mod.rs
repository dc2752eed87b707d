//! Sibling expansion for convention-driven formats.
//!
//! A changed `main.tf` makes the `variables.tf` and `outputs.tf` next to it
//! eligible for ranking. Sibling edges carry no score of their own.

use crate::domain::SiblingConfig;
use crate::graph::{EdgeBuffer, EdgeKind};
use crate::utils::paths::{extension_of, file_name, parent_dir, relative_to};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct SiblingOutcome {
    pub edges: EdgeBuffer,
    /// Every file made eligible through a sibling edge.
    pub members: BTreeSet<String>,
}

/// Whether conventions rather than symbols tie `path` to its neighbours.
pub fn is_convention_driven(path: &str, config: &SiblingConfig) -> bool {
    if let Some(ext) = extension_of(path) {
        if config.extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext)) {
            return true;
        }
    }
    let name = file_name(path).to_ascii_lowercase();
    config.file_names.iter().any(|known| {
        let known = known.to_ascii_lowercase();
        name == known || name.starts_with(&format!("{known}."))
    })
}

/// For each convention-driven seed, link it to the convention-driven files in
/// its directory. Siblings must be in `candidates`; seeds are never siblings.
pub fn sibling_edges(
    root: &Path,
    seeds: &BTreeSet<String>,
    candidates: &BTreeSet<String>,
    config: &SiblingConfig,
) -> SiblingOutcome {
    let mut outcome = SiblingOutcome::default();
    let mut listings: BTreeMap<&str, Vec<String>> = BTreeMap::new();

    for seed in seeds.iter().filter(|s| is_convention_driven(s, config)) {
        let dir = parent_dir(seed);
        let siblings = listings.entry(dir).or_insert_with(|| {
            list_directory(root, dir)
                .into_iter()
                .filter(|path| {
                    !seeds.contains(path)
                        && candidates.contains(path)
                        && is_convention_driven(path, config)
                })
                .take(config.max_files_per_dir)
                .collect()
        });
        for sibling in siblings.iter() {
            let (from, to) = (seed.as_str(), sibling.as_str());
            outcome.edges.push(from, to, EdgeKind::Sibling, config.edge_weight);
            outcome.members.insert(sibling.clone());
        }
    }

    tracing::debug!("Sibling expansion made {} file(s) eligible", outcome.members.len());
    outcome
}

/// Files directly inside `root/dir`, as sorted repository-relative paths.
fn list_directory(root: &Path, dir: &str) -> Vec<String> {
    let absolute = if dir.is_empty() { root.to_path_buf() } else { root.join(dir) };
    WalkDir::new(&absolute)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| relative_to(root, entry.path()))
        .collect()
}
