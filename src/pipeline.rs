//! End-to-end diff context construction.
//!
//! Diff first, then scan and read, then the signal producers, one graph,
//! one ranking pass and the assembler.

use crate::assemble::{Assembler, Candidate, SeedSource, Signals};
use crate::cochange::mine_cochange;
use crate::domain::{Config, ContextStats, DiffContext, SourceFile};
use crate::error::{ContextError, Result};
use crate::extract::{extract_all, DefaultExtractor, SemanticExtractor};
use crate::git::{open_repository, read_diff, workdir};
use crate::graph::{build_reference_edges, EdgeKind, NodeId, ReferenceGraph};
use crate::lexical::{lexical_edges, FileId};
use crate::rank::personalized_pagerank;
use crate::scan::scan_repository;
use crate::sibling::sibling_edges;
use crate::utils::{read_text_file, HeuristicTokenCounter, TokenCounter};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Build the context for `diff_range` in the repository at `root_dir` with
/// default configuration. `None` uses the default budget.
pub fn build_diff_context(
    root_dir: &Path,
    diff_range: &str,
    budget_tokens: Option<usize>,
) -> Result<DiffContext> {
    ContextEngine::new(Config::default()).build(root_dir, diff_range, budget_tokens)
}

/// A configured engine. Extractor and token counter are swappable.
pub struct ContextEngine {
    config: Config,
    extractor: Box<dyn SemanticExtractor>,
    counter: Box<dyn TokenCounter>,
}

impl ContextEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            extractor: Box::new(DefaultExtractor),
            counter: Box::new(HeuristicTokenCounter),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn SemanticExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_token_counter(mut self, counter: Box<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build(
        &self,
        root_dir: &Path,
        diff_range: &str,
        budget_tokens: Option<usize>,
    ) -> Result<DiffContext> {
        let config = &self.config;
        let budget = match budget_tokens {
            Some(0) => return Err(ContextError::InvalidBudget),
            Some(budget) => budget,
            None => config.limits.default_budget_tokens,
        };
        config.validate()?;

        let repo = open_repository(root_dir)?;
        let root = workdir(&repo)?;
        let changes = read_diff(&repo, diff_range)?;
        tracing::info!("{} file(s) changed in {}", changes.files.len(), diff_range);

        let mut stats = ContextStats { seed_count: changes.files.len(), ..Default::default() };
        if changes.is_empty() {
            return Ok(DiffContext::new(Vec::new(), budget, stats));
        }

        let (scanned, scan_stats) = scan_repository(&root, config).map_err(ContextError::Scan)?;
        stats.files_scanned = scanned.len();
        let sizes: BTreeMap<String, u64> =
            scanned.into_iter().map(|f| (f.relative_path, f.size_bytes)).collect();
        let candidates: BTreeSet<String> = sizes.keys().cloned().collect();
        let seeds: BTreeSet<String> = changes.seed_paths().map(str::to_string).collect();

        let files = read_sources(&root, &sizes, &seeds, config.limits.max_file_size);
        tracing::debug!("Read {} file(s) as text", files.len());
        let seed_ids: BTreeSet<FileId> = files
            .iter()
            .enumerate()
            .filter(|(_, f)| seeds.contains(&f.path))
            .map(|(id, _)| id)
            .collect();

        let head = changes.head.commit.as_deref();
        let ((reference, lexical), cochange) = rayon::join(
            || {
                rayon::join(
                    || {
                        let infos = extract_all(self.extractor.as_ref(), &files);
                        build_reference_edges(&files, &infos, &config.graph)
                    },
                    || {
                        lexical_edges(
                            &files,
                            &seed_ids,
                            &config.lexical,
                            config.limits.rare_identifier_threshold,
                        )
                    },
                )
            },
            || mine_cochange(&root, head, &seeds, &candidates, &config.cochange),
        );
        let sibling = sibling_edges(&root, &seeds, &candidates, &config.sibling);

        stats.lexical_terms = lexical.terms_indexed;
        stats.lexical_hubs_suppressed = lexical.hubs_suppressed;
        stats.cochange_pairs = cochange.pairs.len();
        stats.cochange_commits_used = cochange.commits_used;

        let mut graph = ReferenceGraph::new();
        let nodes: BTreeSet<&str> = files
            .iter()
            .map(|f| f.path.as_str())
            .chain(seeds.iter().map(String::as_str))
            .collect();
        for path in nodes {
            graph.add_node(path);
        }
        graph.merge(reference);
        graph.merge(lexical.edges);
        graph.merge(cochange.edges);
        graph.merge(sibling.edges);
        tracing::debug!("Graph: {} node(s), {} edge(s)", graph.node_count(), graph.edge_count());

        let seed_nodes: Vec<NodeId> = seeds.iter().filter_map(|s| graph.node_id(s)).collect();
        let scores = personalized_pagerank(&graph, &seed_nodes, &config.ppr);
        let distances = graph.distances(&seed_nodes);
        let seed_signals = strongest_seed_edges(&graph, &seed_nodes);

        let contents: HashMap<&str, &str> =
            files.iter().map(|f| (f.path.as_str(), f.content.as_str())).collect();
        let ranked: Vec<Candidate<'_>> = sizes
            .iter()
            .filter(|(path, _)| !seeds.contains(*path))
            .filter_map(|(path, &size_bytes)| {
                let id = graph.node_id(path)?;
                let (lexical, cochange) =
                    seed_signals.get(&id).copied().unwrap_or((0.0, 0.0));
                Some(Candidate {
                    path: path.as_str(),
                    signals: Signals { ppr: scores.get(id), lexical, cochange },
                    distance: distances[id.index()],
                    sibling: sibling.members.contains(path),
                    size_bytes,
                    content: contents.get(path.as_str()).copied(),
                })
            })
            .collect();
        let seed_sources: Vec<SeedSource<'_>> = changes
            .files
            .iter()
            .map(|change| SeedSource {
                change,
                content: contents.get(change.path.as_str()).copied(),
            })
            .collect();

        let assembler = Assembler::new(config, self.counter.as_ref());
        tracing::debug!("Fusing scores with '{}'", assembler.fusion_name());
        let assembly = assembler.assemble(&seed_sources, ranked, budget);

        stats.graph_nodes = graph.node_count();
        stats.graph_edges = graph.edge_count();
        stats.lexical_edges = graph.edge_count_of(EdgeKind::Lexical);
        stats.cochange_edges = graph.edge_count_of(EdgeKind::Cochange);
        stats.sibling_candidates = sibling.members.len();
        stats.cochange_commits_walked = cochange.commits_walked;
        stats.cochange_truncated = cochange.truncated.map(|t| t.as_str().to_string());
        stats.ppr_iterations = scores.iterations;
        stats.ppr_converged = scores.converged;
        stats.candidates_considered = assembly.candidates_considered;
        stats.candidates_dropped_unreadable = assembly.dropped_unreadable;
        stats.candidates_dropped_size = assembly.dropped_size + scan_stats.files_skipped_size;
        stats.seeds_over_budget = assembly.seeds_over_budget;

        let context = DiffContext::new(assembly.fragments, budget, stats);
        tracing::info!(
            "Selected {} fragment(s), {} of {} token(s)",
            context.fragment_count,
            context.tokens_used,
            context.budget_tokens
        );
        Ok(context)
    }
}

/// Read scanned files and seeds in parallel, sorted by path. Seeds are read
/// even when the scanner excluded them and regardless of size; files that
/// cannot be read as text are left out.
fn read_sources(
    root: &Path,
    sizes: &BTreeMap<String, u64>,
    seeds: &BTreeSet<String>,
    max_file_size: u64,
) -> Vec<SourceFile> {
    let paths: BTreeSet<&String> = sizes.keys().chain(seeds.iter()).collect();
    let paths: Vec<&String> = paths.into_iter().collect();
    paths
        .par_iter()
        .filter_map(|path| {
            let limit = (!seeds.contains(*path)).then_some(max_file_size);
            let absolute = root.join(path.as_str());
            if !absolute.is_file() {
                return None;
            }
            match read_text_file(&absolute, limit) {
                Ok(content) => Some(SourceFile::new(path.as_str(), content)),
                Err(e) => {
                    tracing::debug!("Skipping {}: {:#}", path, e);
                    None
                }
            }
        })
        .collect()
}

/// Per non-seed node: the strongest lexical and co-change edge weights
/// leaving any seed towards it.
fn strongest_seed_edges(
    graph: &ReferenceGraph,
    seeds: &[NodeId],
) -> HashMap<NodeId, (f64, f64)> {
    let seeds: BTreeSet<NodeId> = seeds.iter().copied().collect();
    let mut strongest: HashMap<NodeId, (f64, f64)> = HashMap::new();
    for edge in graph.edges().filter(|e| seeds.contains(&e.source)) {
        let entry = strongest.entry(edge.target).or_insert((0.0, 0.0));
        match edge.kind {
            EdgeKind::Lexical => entry.0 = entry.0.max(edge.weight),
            EdgeKind::Cochange => entry.1 = entry.1.max(edge.weight),
            _ => {}
        }
    }
    strongest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strongest_edges_come_from_seeds_only() {
        let mut graph = ReferenceGraph::new();
        let seed = graph.add_node("seed.py");
        let other_seed = graph.add_node("other_seed.py");
        let target = graph.add_node("target.py");
        graph.add_edge(seed, target, EdgeKind::Lexical, 0.12);
        graph.add_edge(other_seed, target, EdgeKind::Lexical, 0.18);
        graph.add_edge(seed, target, EdgeKind::Cochange, 0.4);
        graph.add_edge(target, seed, EdgeKind::Cochange, 0.9);
        graph.add_edge(seed, target, EdgeKind::ForwardCall, 0.25);

        let strongest = strongest_seed_edges(&graph, &[seed, other_seed]);
        let (lexical, cochange) = strongest[&target];
        assert!((lexical - 0.18).abs() < 1e-12);
        assert!((cochange - 0.4).abs() < 1e-12);
        assert!(!strongest.contains_key(&seed));
    }

    #[test]
    fn zero_budget_is_rejected_before_touching_git() {
        let temp_dir = tempfile::TempDir::new().expect("tmp");
        let result = build_diff_context(temp_dir.path(), "HEAD~1..HEAD", Some(0));
        assert!(matches!(result, Err(ContextError::InvalidBudget)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = Config::default();
        config.ppr.alpha = 1.5;
        let temp_dir = tempfile::TempDir::new().expect("tmp");
        let result = ContextEngine::new(config).build(temp_dir.path(), "HEAD", None);
        assert!(matches!(result, Err(ContextError::InvalidConfig(_))));
    }
}
