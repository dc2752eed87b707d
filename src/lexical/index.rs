//! Inverted index with smoothed idf weighting and hub detection.

use crate::domain::LexicalConfig;
use std::collections::{BTreeMap, BTreeSet};

/// Position of a document in the slice the index was built from.
pub type FileId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub file: FileId,
    pub tf: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    doc_count: usize,
    weights: BTreeMap<String, f64>,
    postings: BTreeMap<String, Vec<Posting>>,
    vectors: Vec<BTreeMap<String, f64>>,
    norms: Vec<f64>,
}

fn smoothed_idf(doc_count: usize, df: usize) -> f64 {
    ((doc_count as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
}

fn sublinear_tf(tf: u32) -> f64 {
    1.0 + f64::from(tf.max(1)).ln()
}

impl LexicalIndex {
    /// Build from per-document term frequencies. Document ids are slice
    /// positions; callers pass documents sorted by path so ids order like paths.
    pub fn build(
        docs: &[BTreeMap<String, u32>],
        config: &LexicalConfig,
        rare_identifier_threshold: usize,
    ) -> Self {
        let doc_count = docs.len();
        if doc_count == 0 {
            return Self::default();
        }

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        let mut occurrences: BTreeMap<&str, u64> = BTreeMap::new();
        for doc in docs {
            for (term, tf) in doc {
                *df.entry(term.as_str()).or_insert(0) += 1;
                *occurrences.entry(term.as_str()).or_insert(0) += u64::from(*tf);
            }
        }

        let mut weights = BTreeMap::new();
        for (term, &term_df) in &df {
            let ratio = term_df as f64 / doc_count as f64;
            let idf = smoothed_idf(doc_count, term_df);
            if ratio > config.max_df_ratio || idf < config.min_idf {
                continue;
            }
            let rare = occurrences[term] <= rare_identifier_threshold as u64;
            let weight = if rare { idf * config.rare_boost } else { idf };
            weights.insert(term.to_string(), weight);
        }

        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for (file, doc) in docs.iter().enumerate() {
            for (term, &tf) in doc {
                if weights.contains_key(term) {
                    postings.entry(term.clone()).or_default().push(Posting { file, tf });
                }
            }
        }
        for list in postings.values_mut() {
            list.sort_by(|a, b| b.tf.cmp(&a.tf).then(a.file.cmp(&b.file)));
            list.truncate(config.max_postings);
        }

        let mut vectors: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new(); doc_count];
        for (term, list) in &postings {
            let weight = weights[term];
            for posting in list {
                vectors[posting.file].insert(term.clone(), sublinear_tf(posting.tf) * weight);
            }
        }
        let norms = vectors
            .iter()
            .map(|v| v.values().map(|x| x * x).sum::<f64>().sqrt())
            .collect();

        Self { doc_count, weights, postings, vectors, norms }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Number of terms that survived df/idf filtering.
    pub fn term_count(&self) -> usize {
        self.weights.len()
    }

    pub fn weight(&self, term: &str) -> Option<f64> {
        self.weights.get(term).copied()
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Cosine similarity of `seed` against every document sharing a term.
    pub fn similarities(&self, seed: FileId) -> BTreeMap<FileId, f64> {
        let mut dots: BTreeMap<FileId, f64> = BTreeMap::new();
        let Some(vector) = self.vectors.get(seed) else {
            return dots;
        };
        for (term, seed_value) in vector {
            let weight = self.weights[term];
            for posting in &self.postings[term] {
                if posting.file != seed {
                    *dots.entry(posting.file).or_insert(0.0) +=
                        seed_value * sublinear_tf(posting.tf) * weight;
                }
            }
        }

        let seed_norm = self.norms[seed];
        dots.into_iter()
            .filter_map(|(file, dot)| {
                let denom = seed_norm * self.norms[file];
                (denom > 0.0).then(|| (file, (dot / denom).min(1.0)))
            })
            .collect()
    }

    /// Per document: how many other documents its postings connect it to,
    /// counted with multiplicity across terms.
    pub fn fan_out(&self) -> Vec<usize> {
        let mut fan_out = vec![0usize; self.doc_count];
        for list in self.postings.values() {
            let reach = list.len().saturating_sub(1);
            for posting in list {
                fan_out[posting.file] += reach;
            }
        }
        fan_out
    }

    /// Documents whose fan-out is strictly above the `percentile` value of
    /// the fan-out distribution. `exempt` documents are never hubs.
    pub fn hubs(&self, percentile: f64, exempt: &BTreeSet<FileId>) -> BTreeSet<FileId> {
        let fan_out = self.fan_out();
        if fan_out.is_empty() {
            return BTreeSet::new();
        }
        let mut sorted = fan_out.clone();
        sorted.sort_unstable();
        let rank = (percentile.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
        let threshold = sorted[rank.clamp(1, sorted.len()) - 1];

        fan_out
            .iter()
            .enumerate()
            .filter(|(file, &value)| value > threshold && !exempt.contains(file))
            .map(|(file, _)| file)
            .collect()
    }
}
