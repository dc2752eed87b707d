//! Personalized PageRank over the unified file graph.

use crate::domain::PprConfig;
use crate::graph::{EdgeKind, NodeId, ReferenceGraph};

/// Stationary relevance per node, normalized to sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceScores {
    scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl RelevanceScores {
    pub fn get(&self, node: NodeId) -> f64 {
        self.scores.get(node.index()).copied().unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }

    fn empty(len: usize) -> Self {
        Self { scores: vec![0.0; len], iterations: 0, converged: true }
    }
}

/// Random walk with restart to `seeds`.
///
/// Each step keeps `1 - alpha` of the mass at the seeds and spreads `alpha`
/// along walkable out-edges proportionally to weight. Mass sitting on nodes
/// with no walkable out-edge teleports back to the seeds. Iteration stops when
/// the L1 change drops below `tolerance` or after `max_iterations`.
pub fn personalized_pagerank(
    graph: &ReferenceGraph,
    seeds: &[NodeId],
    config: &PprConfig,
) -> RelevanceScores {
    let n = graph.node_count();
    let mut seeds: Vec<NodeId> = seeds.iter().copied().filter(|s| s.index() < n).collect();
    seeds.sort_unstable();
    seeds.dedup();
    if n == 0 || seeds.is_empty() {
        return RelevanceScores::empty(n);
    }

    let mut restart = vec![0.0; n];
    let share = 1.0 / seeds.len() as f64;
    for seed in &seeds {
        restart[seed.index()] = share;
    }

    let adjacency = graph.adjacency(EdgeKind::is_walkable);
    let out_weight: Vec<f64> = graph.node_ids().map(|id| adjacency.out_weight(id)).collect();
    let alpha = config.alpha;

    let mut scores = restart.clone();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        let mut next = vec![0.0; n];
        let mut dangling = 0.0;
        for (u, &mass) in scores.iter().enumerate() {
            if mass == 0.0 {
                continue;
            }
            if out_weight[u] <= 0.0 {
                dangling += mass;
                continue;
            }
            let spread = alpha * mass / out_weight[u];
            for &(v, w) in &adjacency.out[u] {
                next[v.index()] += spread * w;
            }
        }
        for (v, value) in next.iter_mut().enumerate() {
            *value += (1.0 - alpha) * restart[v] + alpha * dangling * restart[v];
        }

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        iterations += 1;
        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        for value in &mut scores {
            *value /= total;
        }
    }
    tracing::debug!(
        "PPR finished after {} iteration(s), converged: {}",
        iterations,
        converged
    );
    RelevanceScores { scores, iterations, converged }
}
