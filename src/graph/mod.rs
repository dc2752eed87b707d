//! Unified file graph.
//!
//! Nodes are repository-relative paths interned as [`NodeId`]s. Edges are
//! keyed by `(source, target, kind)`; adding an existing key sums weights.
//! Producers never touch the graph directly: each fills its own
//! [`EdgeBuffer`] and the buffers are merged at one synchronization point.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

pub mod builder;
pub mod resolve;

pub use builder::build_reference_edges;
pub use resolve::ModuleResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    ForwardCall,
    ForwardType,
    BackwardCall,
    Import,
    Lexical,
    Cochange,
    Sibling,
}

impl EdgeKind {
    /// Sibling edges only grant eligibility; the ranker never follows them.
    pub fn is_walkable(self) -> bool {
        !matches!(self, EdgeKind::Sibling)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::ForwardCall => "forward_call",
            EdgeKind::ForwardType => "forward_type",
            EdgeKind::BackwardCall => "backward_call",
            EdgeKind::Import => "import",
            EdgeKind::Lexical => "lexical",
            EdgeKind::Cochange => "cochange",
            EdgeKind::Sibling => "sibling",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
}

/// Path-keyed edges collected by one producer.
#[derive(Debug, Clone, Default)]
pub struct EdgeBuffer {
    edges: Vec<PendingEdge>,
}

impl EdgeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Self loops and non-positive or non-finite weights are dropped.
    pub fn push(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
        weight: f64,
    ) {
        let (source, target) = (source.into(), target.into());
        if source == target || !weight.is_finite() || weight <= 0.0 {
            return;
        }
        self.edges.push(PendingEdge { source, target, kind, weight });
    }

    pub fn extend(&mut self, other: EdgeBuffer) {
        self.edges.extend(other.edges);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEdge> {
        self.edges.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub weight: f64,
}

/// Out-neighbours per node with weights summed across the selected kinds.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    pub out: Vec<Vec<(NodeId, f64)>>,
}

impl Adjacency {
    pub fn out_weight(&self, node: NodeId) -> f64 {
        self.out[node.index()].iter().map(|(_, w)| w).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    paths: Vec<String>,
    index: HashMap<String, NodeId>,
    edges: BTreeMap<(NodeId, NodeId, EdgeKind), f64>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `path`, returning the existing id when already present.
    pub fn add_node(&mut self, path: &str) -> NodeId {
        if let Some(id) = self.index.get(path) {
            return *id;
        }
        let id = NodeId(self.paths.len() as u32);
        self.paths.push(path.to_string());
        self.index.insert(path.to_string(), id);
        id
    }

    pub fn node_id(&self, path: &str) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn path(&self, id: NodeId) -> &str {
        &self.paths[id.index()]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.paths.len() as u32).map(NodeId)
    }

    pub fn node_count(&self) -> usize {
        self.paths.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, kind: EdgeKind, weight: f64) {
        if source == target || !weight.is_finite() || weight <= 0.0 {
            return;
        }
        *self.edges.entry((source, target, kind)).or_insert(0.0) += weight;
    }

    /// Fold a producer's buffer in, interning any path not seen before.
    pub fn merge(&mut self, buffer: EdgeBuffer) {
        for edge in buffer.edges {
            let source = self.add_node(&edge.source);
            let target = self.add_node(&edge.target);
            self.add_edge(source, target, edge.kind, edge.weight);
        }
    }

    pub fn weight(&self, source: NodeId, target: NodeId, kind: EdgeKind) -> Option<f64> {
        self.edges.get(&(source, target, kind)).copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|(&(source, target, kind), &weight)| Edge {
            source,
            target,
            kind,
            weight,
        })
    }

    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.edges.keys().filter(|(_, _, k)| *k == kind).count()
    }

    /// Targets of `kind` edges leaving any of `sources`.
    pub fn targets_of_kind(&self, sources: &BTreeSet<NodeId>, kind: EdgeKind) -> BTreeSet<NodeId> {
        self.edges
            .keys()
            .filter(|(s, _, k)| *k == kind && sources.contains(s))
            .map(|(_, t, _)| *t)
            .collect()
    }

    /// Build out-adjacency over the kinds accepted by `include`, neighbours in
    /// ascending id order.
    pub fn adjacency(&self, include: impl Fn(EdgeKind) -> bool) -> Adjacency {
        let mut merged: Vec<BTreeMap<NodeId, f64>> = vec![BTreeMap::new(); self.paths.len()];
        for (&(source, target, kind), &weight) in &self.edges {
            if include(kind) {
                *merged[source.index()].entry(target).or_insert(0.0) += weight;
            }
        }
        Adjacency { out: merged.into_iter().map(|m| m.into_iter().collect()).collect() }
    }

    /// Hop count from the nearest seed along walkable edges; `None` if unreachable.
    pub fn distances(&self, seeds: &[NodeId]) -> Vec<Option<u32>> {
        let adjacency = self.adjacency(EdgeKind::is_walkable);
        let mut dist = vec![None; self.paths.len()];
        let mut queue = VecDeque::new();
        for &seed in seeds {
            if dist[seed.index()].is_none() {
                dist[seed.index()] = Some(0);
                queue.push_back(seed);
            }
        }
        while let Some(node) = queue.pop_front() {
            let next = dist[node.index()].map_or(0, |d| d + 1);
            for &(neighbor, _) in &adjacency.out[node.index()] {
                if dist[neighbor.index()].is_none() {
                    dist[neighbor.index()] = Some(next);
                    queue.push_back(neighbor);
                }
            }
        }
        dist
    }
}
