//! Symbol-level reference edges between files.

use super::{EdgeBuffer, EdgeKind, ModuleResolver};
use crate::domain::{GraphConfig, SemanticInfo, SourceFile};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Connect files through the symbols they use and other files define, plus
/// resolved imports of module-based files.
///
/// `files` and `infos` are parallel slices. Every forward edge gets a mirror
/// `BackwardCall` edge scaled by `backward_factor`.
pub fn build_reference_edges(
    files: &[SourceFile],
    infos: &[SemanticInfo],
    config: &GraphConfig,
) -> EdgeBuffer {
    debug_assert_eq!(files.len(), infos.len());

    let mut definitions: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    for (idx, info) in infos.iter().enumerate() {
        for symbol in info.provided_symbols() {
            definitions.entry(symbol.as_str()).or_default().insert(idx);
        }
    }
    let resolver = ModuleResolver::new(files.iter().map(|f| f.path.as_str()));

    let per_file: Vec<EdgeBuffer> = (0..files.len())
        .into_par_iter()
        .map(|idx| {
            let mut buffer = symbol_edges(idx, files, infos, &definitions, config);
            buffer.extend(import_edges(&files[idx].path, &infos[idx], &resolver, config));
            buffer
        })
        .collect();

    let mut edges = EdgeBuffer::new();
    for buffer in per_file {
        edges.extend(buffer);
    }
    tracing::debug!("Reference graph produced {} edge(s)", edges.len());
    edges
}

fn symbol_edges(
    idx: usize,
    files: &[SourceFile],
    infos: &[SemanticInfo],
    definitions: &BTreeMap<&str, BTreeSet<usize>>,
    config: &GraphConfig,
) -> EdgeBuffer {
    let info = &infos[idx];
    let own: BTreeSet<&String> = info.provided_symbols().collect();

    let call_like: BTreeSet<&String> = info.calls.iter().chain(info.references.iter()).collect();
    let mut counts: BTreeMap<(usize, EdgeKind), usize> = BTreeMap::new();
    let uses = call_like
        .into_iter()
        .map(|s| (s, EdgeKind::ForwardCall))
        .chain(info.type_refs.iter().map(|s| (s, EdgeKind::ForwardType)));

    for (symbol, kind) in uses {
        if own.contains(symbol) {
            continue;
        }
        let Some(definers) = definitions.get(symbol.as_str()) else {
            continue;
        };
        if definers.len() > config.max_definitions_per_symbol {
            continue;
        }
        for &other in definers {
            if other != idx {
                *counts.entry((other, kind)).or_insert(0) += 1;
            }
        }
    }

    let mut buffer = EdgeBuffer::new();
    let source = &files[idx].path;
    for ((other, kind), count) in counts {
        let weight = count.min(config.max_symbols_per_edge) as f64 * config.symbol_weight;
        let target = &files[other].path;
        buffer.push(source.as_str(), target.as_str(), kind, weight);
        buffer.push(
            target.as_str(),
            source.as_str(),
            EdgeKind::BackwardCall,
            weight * config.backward_factor,
        );
    }
    buffer
}

fn import_edges(
    path: &str,
    info: &SemanticInfo,
    resolver: &ModuleResolver<'_>,
    config: &GraphConfig,
) -> EdgeBuffer {
    let targets: BTreeSet<String> =
        info.imports().filter_map(|specifier| resolver.resolve(path, specifier)).collect();

    let mut buffer = EdgeBuffer::new();
    for target in targets {
        buffer.push(path, target.as_str(), EdgeKind::Import, config.import_weight);
        buffer.push(
            target.as_str(),
            path,
            EdgeKind::BackwardCall,
            config.import_weight * config.backward_factor,
        );
    }
    buffer
}
