//! Budget-constrained fragment assembly.
//!
//! Seeds always come first. Non-seed candidates are ranked by their fused
//! score and packed greedily until the first one that does not fit.

use crate::domain::{
    ChangeStatus, Config, FileChange, Fragment, FragmentKind, LimitsConfig, SeedContent,
};
use crate::utils::{fragment_id, truncate_to_tokens, TokenCounter};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub mod fusion;

pub use fusion::{fusion_for, MaxFusion, ScoreFusion, Signals, SumFusion, WeightedFusion};

/// A changed file and its current content, if it could be read.
#[derive(Debug, Clone, Copy)]
pub struct SeedSource<'a> {
    pub change: &'a FileChange,
    pub content: Option<&'a str>,
}

/// A non-seed file that may be pulled into the context.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub path: &'a str,
    pub signals: Signals,
    /// Hops from the nearest seed over walkable edges.
    pub distance: Option<u32>,
    /// Made eligible by a sibling edge.
    pub sibling: bool,
    pub size_bytes: u64,
    /// `None` when the file could not be read as text.
    pub content: Option<&'a str>,
}

/// Fragments plus the bookkeeping the pipeline reports in its stats.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub fragments: Vec<Fragment>,
    pub candidates_considered: usize,
    pub dropped_unreadable: usize,
    pub dropped_size: usize,
    pub seeds_over_budget: bool,
}

pub struct Assembler<'a> {
    limits: &'a LimitsConfig,
    seed_content: SeedContent,
    fusion: Box<dyn ScoreFusion>,
    counter: &'a dyn TokenCounter,
}

struct Draft {
    path: String,
    content: String,
    kind: FragmentKind,
    truncated: bool,
}

/// Outcome of fitting the seeds into the budget.
#[derive(Debug, Clone, Copy, Default)]
struct SeedFit {
    /// Seed contents were cut; nothing is left for expansions.
    shrunk: bool,
    /// Per-fragment overhead alone exceeds the budget.
    over_budget: bool,
}

struct Ranked<'a> {
    candidate: Candidate<'a>,
    score: f64,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a Config, counter: &'a dyn TokenCounter) -> Self {
        Self {
            limits: &config.limits,
            seed_content: config.assemble.seed_content,
            fusion: fusion_for(config.assemble.fusion),
            counter,
        }
    }

    pub fn with_fusion(mut self, fusion: Box<dyn ScoreFusion>) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn fusion_name(&self) -> &'static str {
        self.fusion.name()
    }

    pub fn assemble(
        &self,
        seeds: &[SeedSource<'_>],
        candidates: Vec<Candidate<'_>>,
        budget: usize,
    ) -> Assembly {
        let mut assembly = Assembly::default();
        let overhead = self.limits.overhead_per_fragment;

        let mut seeds: Vec<&SeedSource<'_>> = seeds.iter().collect();
        seeds.sort_by(|a, b| a.change.path.cmp(&b.change.path));
        seeds.dedup_by(|a, b| a.change.path == b.change.path);
        if seeds.len() > self.limits.max_fragments {
            tracing::warn!(
                "{} changed file(s) exceed max_fragments; keeping the first {}",
                seeds.len(),
                self.limits.max_fragments
            );
            seeds.truncate(self.limits.max_fragments);
        }

        let mut drafts: Vec<Draft> = seeds.iter().map(|seed| self.seed_draft(seed)).collect();
        let fit = self.fit_seeds(&mut drafts, budget);
        assembly.seeds_over_budget = fit.over_budget;

        let seed_paths: BTreeSet<String> = drafts.iter().map(|d| d.path.clone()).collect();
        let mut used = 0;
        for draft in drafts {
            let fragment = self.fragment(draft, 1.0);
            used += fragment.tokens;
            assembly.fragments.push(fragment);
        }

        // Shrunk seeds own the whole budget; truncation slack is not handed out.
        let mut remaining = if fit.shrunk { 0 } else { budget.saturating_sub(used) };
        let ranked = self.rank(candidates, &seed_paths, &mut assembly);
        for Ranked { candidate, score } in ranked {
            let Some(content) = candidate.content else {
                assembly.dropped_unreadable += 1;
                continue;
            };
            if assembly.candidates_considered >= self.limits.max_expansion_files
                || assembly.fragments.len() >= self.limits.max_fragments
            {
                break;
            }
            assembly.candidates_considered += 1;

            let cost = self.counter.count_tokens(content) + overhead;
            if cost > remaining {
                tracing::debug!(
                    "Stopping at {}: needs {} token(s), {} left",
                    candidate.path,
                    cost,
                    remaining
                );
                break;
            }
            remaining -= cost;
            let draft = Draft {
                path: candidate.path.to_string(),
                content: content.to_string(),
                kind: FragmentKind::Expansion,
                truncated: false,
            };
            assembly.fragments.push(self.fragment(draft, score));
        }

        tracing::debug!(
            "Assembled {} fragment(s) from {} seed(s), {} candidate(s) considered",
            assembly.fragments.len(),
            seed_paths.len(),
            assembly.candidates_considered
        );
        assembly
    }

    fn seed_draft(&self, seed: &SeedSource<'_>) -> Draft {
        let change = seed.change;
        let placeholder = |reason: &str| Draft {
            path: change.path.clone(),
            content: format!("{}: {}, content unavailable\n", change.path, reason),
            kind: FragmentKind::Placeholder,
            truncated: false,
        };

        if change.status == ChangeStatus::Deleted {
            return placeholder("deleted in this change");
        }
        if change.binary {
            return placeholder("binary file");
        }
        let oversized =
            seed.content.is_some_and(|text| text.len() as u64 > self.limits.max_file_size);
        if self.seed_content == SeedContent::Hunks || oversized {
            if let Some(patch) = change.patch_text() {
                return Draft {
                    path: change.path.clone(),
                    content: patch,
                    kind: FragmentKind::SeedHunks,
                    truncated: false,
                };
            }
        }
        if oversized {
            return placeholder("exceeds max_file_size");
        }
        match seed.content {
            Some(text) => Draft {
                path: change.path.clone(),
                content: text.to_string(),
                kind: FragmentKind::SeedFile,
                truncated: false,
            },
            None => {
                tracing::warn!("Changed file {} could not be read", change.path);
                placeholder("unreadable")
            }
        }
    }

    /// Shrink seed contents by water-filling until they fit `budget`: the
    /// smallest seeds keep their content, the rest share what is left
    /// equally. When per-fragment overhead alone exceeds the budget every
    /// seed is emptied.
    fn fit_seeds(&self, drafts: &mut [Draft], budget: usize) -> SeedFit {
        let overhead_total = drafts.len() * self.limits.overhead_per_fragment;
        let costs: Vec<usize> =
            drafts.iter().map(|d| self.counter.count_tokens(&d.content)).collect();
        if costs.iter().sum::<usize>() + overhead_total <= budget {
            return SeedFit::default();
        }

        let over_budget = budget < overhead_total;
        if over_budget {
            tracing::warn!(
                "Budget of {} token(s) cannot cover {} changed file(s)",
                budget,
                drafts.len()
            );
        }
        let mut available = budget.saturating_sub(overhead_total);

        let mut order: Vec<usize> = (0..drafts.len()).collect();
        order.sort_by_key(|&i| (costs[i], i));
        let mut caps = vec![usize::MAX; drafts.len()];
        for (position, &i) in order.iter().enumerate() {
            let share = available / (drafts.len() - position);
            if costs[i] <= share {
                available -= costs[i];
            } else {
                for &j in &order[position..] {
                    caps[j] = share;
                }
                break;
            }
        }

        for (draft, cap) in drafts.iter_mut().zip(caps) {
            if cap == usize::MAX {
                continue;
            }
            let kept = truncate_to_tokens(&draft.content, cap, self.counter);
            if kept.len() < draft.content.len() {
                draft.content = kept.to_string();
                draft.truncated = true;
            }
        }
        SeedFit { shrunk: true, over_budget }
    }

    fn rank<'c>(
        &self,
        candidates: Vec<Candidate<'c>>,
        seed_paths: &BTreeSet<String>,
        assembly: &mut Assembly,
    ) -> Vec<Ranked<'c>> {
        let mut ranked = Vec::new();
        for candidate in candidates {
            if seed_paths.contains(candidate.path) {
                continue;
            }
            let score = self.fusion.fuse(&candidate.signals);
            if !(score > 0.0 || candidate.sibling) {
                continue;
            }
            if candidate.size_bytes > self.limits.max_file_size {
                assembly.dropped_size += 1;
                continue;
            }
            ranked.push(Ranked { candidate, score });
        }
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| compare_distance(a.candidate.distance, b.candidate.distance))
                .then_with(|| a.candidate.path.cmp(b.candidate.path))
        });
        ranked
    }

    fn fragment(&self, draft: Draft, score: f64) -> Fragment {
        let tokens = self.counter.count_tokens(&draft.content) + self.limits.overhead_per_fragment;
        Fragment {
            id: fragment_id(&draft.path, &draft.content),
            path: draft.path,
            content: draft.content,
            kind: draft.kind,
            score,
            tokens,
            truncated: draft.truncated,
        }
    }
}

/// Nearer first; unreachable last.
fn compare_distance(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
