//! Lexical similarity between seeds and the rest of the candidate set.

use crate::domain::{LexicalConfig, SourceFile};
use crate::graph::{EdgeBuffer, EdgeKind};
use rayon::prelude::*;
use std::collections::BTreeSet;

pub mod index;
pub mod tokenize;

pub use index::{FileId, LexicalIndex, Posting};
pub use tokenize::term_frequencies;

#[derive(Debug, Default)]
pub struct LexicalOutcome {
    pub edges: EdgeBuffer,
    pub terms_indexed: usize,
    pub hubs_suppressed: usize,
}

/// Index `files` and emit `Lexical` edges from each seed to its most similar
/// non-hub, non-seed files. `seeds` are positions in `files`.
pub fn lexical_edges(
    files: &[SourceFile],
    seeds: &BTreeSet<FileId>,
    config: &LexicalConfig,
    rare_identifier_threshold: usize,
) -> LexicalOutcome {
    let docs: Vec<_> = files
        .par_iter()
        .map(|file| term_frequencies(&file.content, config.min_term_len))
        .collect();
    let index = LexicalIndex::build(&docs, config, rare_identifier_threshold);
    let hubs = index.hubs(config.hub_percentile, seeds);

    let mut edges = EdgeBuffer::new();
    for &seed in seeds {
        let mut matches: Vec<(FileId, f64)> = index
            .similarities(seed)
            .into_iter()
            .filter(|(file, score)| {
                *score >= config.min_similarity && !seeds.contains(file) && !hubs.contains(file)
            })
            .collect();
        matches.sort_by(|a, b| {
            b.1.total_cmp(&a.1).then_with(|| files[a.0].path.cmp(&files[b.0].path))
        });
        matches.truncate(config.top_k_neighbors);

        let seed_path = files[seed].path.as_str();
        for (file, score) in matches {
            let weight = scale_weight(score, config);
            let other = files[file].path.as_str();
            edges.push(seed_path, other, EdgeKind::Lexical, weight);
            edges.push(other, seed_path, EdgeKind::Lexical, weight * config.backward_factor);
        }
    }

    tracing::debug!(
        "Lexical index: {} term(s), {} hub(s), {} edge(s)",
        index.term_count(),
        hubs.len(),
        edges.len()
    );
    LexicalOutcome { edges, terms_indexed: index.term_count(), hubs_suppressed: hubs.len() }
}

/// Map a similarity in `[min_similarity, 1]` linearly onto `[weight_min, weight_max]`.
pub fn scale_weight(score: f64, config: &LexicalConfig) -> f64 {
    let span = 1.0 - config.min_similarity;
    if span <= f64::EPSILON {
        return config.weight_max;
    }
    let t = ((score - config.min_similarity) / span).clamp(0.0, 1.0);
    config.weight_min + t * (config.weight_max - config.weight_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive() -> LexicalConfig {
        LexicalConfig { max_df_ratio: 1.0, min_idf: 0.0, ..LexicalConfig::default() }
    }

    #[test]
    fn weight_scaling_hits_both_ends() {
        let config = LexicalConfig::default();
        assert!((scale_weight(config.min_similarity, &config) - config.weight_min).abs() < 1e-12);
        assert!((scale_weight(1.0, &config) - config.weight_max).abs() < 1e-12);
        let mid = scale_weight(0.55, &config);
        assert!(mid > config.weight_min && mid < config.weight_max);
    }

    #[test]
    fn similar_config_files_are_linked_in_both_directions() {
        let files = vec![
            SourceFile::new("infra/bucket.tf", "bucket_name replication_role kms_key_alias"),
            SourceFile::new("infra/policy.tf", "bucket_name replication_role kms_key_alias policy"),
            SourceFile::new("docs/unrelated.md", "marketing newsletter campaign"),
        ];
        let config = permissive();
        let seeds = BTreeSet::from([0]);
        let outcome = lexical_edges(&files, &seeds, &config, 3);

        let edges: Vec<_> = outcome.edges.iter().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].source, "infra/bucket.tf");
        assert_eq!(edges[0].target, "infra/policy.tf");
        assert!(edges[0].weight > config.weight_min);
        assert!((edges[1].weight - edges[0].weight * config.backward_factor).abs() < 1e-12);
    }

    #[test]
    fn top_k_limits_edges_per_seed() {
        let body = "service_port health_path replicas";
        let mut files = vec![SourceFile::new("seed.yaml", body)];
        for i in 0..5 {
            files.push(SourceFile::new(format!("svc{i}.yaml"), body));
        }
        let config = LexicalConfig { top_k_neighbors: 2, ..permissive() };
        let outcome = lexical_edges(&files, &BTreeSet::from([0]), &config, 0);
        let forward: Vec<&str> = outcome
            .edges
            .iter()
            .filter(|e| e.source == "seed.yaml")
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(forward, vec!["svc0.yaml", "svc1.yaml"]);
    }

    #[test]
    fn hub_files_are_suppressed_and_counted() {
        let files = vec![
            SourceFile::new("seed.yaml", "alpha_key"),
            SourceFile::new("shared.yaml", "alpha_key gamma_key delta_key"),
            SourceFile::new("a.yaml", "gamma_key"),
            SourceFile::new("b.yaml", "delta_key"),
            SourceFile::new("c.yaml", "lonely_key"),
        ];
        let config = LexicalConfig { hub_percentile: 0.5, ..permissive() };
        let outcome = lexical_edges(&files, &BTreeSet::from([0]), &config, 3);

        assert_eq!(outcome.hubs_suppressed, 1);
        assert_eq!(outcome.terms_indexed, 4);
        assert!(outcome.edges.is_empty());
    }

    #[test]
    fn default_thresholds_ignore_tiny_corpora() {
        let files = vec![
            SourceFile::new("a.py", "calculate_tax amount"),
            SourceFile::new("b.py", "calculate_tax amount"),
        ];
        let outcome = lexical_edges(&files, &BTreeSet::from([0]), &LexicalConfig::default(), 3);
        assert!(outcome.edges.is_empty());
        assert_eq!(outcome.terms_indexed, 0);
    }
}
