//! Relevance ranking of graph nodes relative to the seed set.

pub mod ppr;

pub use ppr::{personalized_pagerank, RelevanceScores};
