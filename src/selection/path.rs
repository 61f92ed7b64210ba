//! Simple-chain checks for the selected edges.
//!
//! Selected edges are kept in traversal order, so `edges[i].target_index ==
//! edges[i + 1].source_index` always holds and no node appears twice.

use crate::error::PathViolation;
use crate::graph::{EdgeKey, RenderEdge};

/// Where a new edge attaches to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Append,
    Prepend,
}

/// Node indices visited by the chain, head first.
pub fn chain_nodes(chain: &[RenderEdge]) -> Vec<usize> {
    let mut nodes = Vec::with_capacity(chain.len() + 1);
    if let Some(first) = chain.first() {
        nodes.push(first.source_index);
    }
    nodes.extend(chain.iter().map(|e| e.target_index));
    nodes
}

/// Decide whether an edge not yet in the chain can be attached.
pub fn extension(chain: &[RenderEdge], key: EdgeKey) -> Result<Extension, PathViolation> {
    if key.source == key.target {
        return Err(PathViolation::Cycle);
    }
    let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
        return Ok(Extension::Append);
    };

    let nodes = chain_nodes(chain);
    let source_on_chain = nodes.contains(&key.source);
    let target_on_chain = nodes.contains(&key.target);

    match (source_on_chain, target_on_chain) {
        (true, true) => Err(PathViolation::Cycle),
        (true, false) if key.source == last.target_index => Ok(Extension::Append),
        (false, true) if key.target == first.source_index => Ok(Extension::Prepend),
        (false, false) => Err(PathViolation::Disconnected),
        _ => Err(PathViolation::Branch),
    }
}

/// Only the first or last edge can leave without splitting the chain.
pub fn check_removal(len: usize, position: usize) -> Result<(), PathViolation> {
    if position == 0 || position + 1 == len {
        Ok(())
    } else {
        Err(PathViolation::Split)
    }
}

/// True when `edges` form one simple directed chain (or are empty).
pub fn is_simple_chain(edges: &[RenderEdge]) -> bool {
    let linked = edges
        .windows(2)
        .all(|pair| pair[0].target_index == pair[1].source_index);
    let nodes = chain_nodes(edges);
    let mut seen = nodes.clone();
    seen.sort_unstable();
    seen.dedup();
    linked && seen.len() == nodes.len()
}
