//! Selection State Machine
//!
//! Owns the current [`RenderGraph`] and the rule under construction. All
//! mutation goes through the methods here; the widget reducer calls them in
//! event order.
//!
//! # Invariants
//!
//! - Selected nodes are unique by `id`.
//! - Selected edges are unique by `(source, target)` and form one simple
//!   directed chain in traversal order (see [`path`]).
//! - Selected edges are copies of edges present in the current graph.

pub mod path;

use access_rule_types::{NodeDescriptor, RulePayload};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{CodecError, SelectionError};
use crate::graph::{EdgeKey, RenderEdge, RenderGraph};
use path::Extension;

/// The rule under construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedSubgraph {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<RenderEdge>,
}

impl SelectedSubgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: i64) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.iter().any(|e| e.key() == key)
    }

    /// First node index of the edge chain.
    pub fn head(&self) -> Option<usize> {
        self.edges.first().map(|e| e.source_index)
    }

    /// Last node index of the edge chain.
    pub fn tail(&self) -> Option<usize> {
        self.edges.last().map(|e| e.target_index)
    }
}

/// Outcome of an idempotent toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Added,
    Removed,
}

/// Traversal direction of a relation relative to the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    To,
    /// The schema declares the relation as incoming.
    From,
}

/// One hop of the selected path, by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub source: String,
    pub relation: String,
    pub direction: Direction,
    pub target: String,
}

/// What `reconcile_from_rule` marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub source: usize,
    pub edge: Option<EdgeKey>,
    pub target: Option<usize>,
}

/// Neo4j's incoming relationship direction.
const INCOMING: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionMachine {
    graph: Option<RenderGraph>,
    selected: SelectedSubgraph,
    permissions: Vec<String>,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> Option<&RenderGraph> {
        self.graph.as_ref()
    }

    pub fn selected(&self) -> &SelectedSubgraph {
        &self.selected
    }

    /// Chosen permission codenames, without app label.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    fn graph_mut(&mut self) -> Result<&mut RenderGraph, SelectionError> {
        self.graph.as_mut().ok_or(SelectionError::NoGraph)
    }

    // ========================================================================
    // GRAPH REPLACEMENT
    // ========================================================================

    /// Install a freshly normalized graph.
    ///
    /// The selection is re-linked to the new graph: nodes by `id`, edges by
    /// the ids of their endpoints in the old graph plus `relation_type`, so
    /// a reordered schema keeps the same path. If any element is missing
    /// from the new graph the whole selection is cleared. Returns whether
    /// the selection survived.
    pub fn replace_graph(&mut self, graph: RenderGraph) -> bool {
        let relinked = relink(&self.selected, self.graph.as_ref(), &graph);
        self.graph = Some(graph);

        match relinked {
            Some(selected) => {
                self.selected = selected;
                true
            }
            None => {
                warn!(
                    nodes = self.selected.nodes.len(),
                    edges = self.selected.edges.len(),
                    "selection no longer matches the schema graph, cleared"
                );
                self.selected = SelectedSubgraph::default();
                self.permissions.clear();
                false
            }
        }
    }

    // ========================================================================
    // TOGGLES
    // ========================================================================

    /// Add the node with `id` to the selection, or remove it if present.
    pub fn toggle_node(&mut self, id: i64) -> Result<Toggle, SelectionError> {
        let graph = self.graph.as_ref().ok_or(SelectionError::NoGraph)?;

        if let Some(position) = self.selected.nodes.iter().position(|n| n.id == id) {
            self.selected.nodes.remove(position);
            return Ok(Toggle::Removed);
        }

        let node = graph.node_by_id(id).ok_or(SelectionError::UnknownNode(id))?;
        self.selected.nodes.push(node.source_item.clone());
        Ok(Toggle::Added)
    }

    /// Add an edge to the selection, or remove the selected edge sharing its
    /// `(source, target)` pair.
    ///
    /// Added edges are the graph's own copy, never `edge` itself. Toggles
    /// that would break the simple-chain shape are rejected.
    pub fn toggle_edge(&mut self, edge: &RenderEdge) -> Result<Toggle, SelectionError> {
        let graph = self.graph.as_ref().ok_or(SelectionError::NoGraph)?;
        let key = edge.key();
        let chain = &mut self.selected.edges;

        if let Some(position) = chain.iter().position(|e| e.key() == key) {
            path::check_removal(chain.len(), position).map_err(|violation| {
                debug!(?key, %violation, "edge removal rejected");
                violation
            })?;
            chain.remove(position);
            return Ok(Toggle::Removed);
        }

        let canonical = graph
            .canonical_edge(edge)
            .ok_or(SelectionError::UnknownEdge {
                source_index: key.source,
                target_index: key.target,
            })?
            .clone();

        match path::extension(chain, key) {
            Ok(Extension::Append) => chain.push(canonical),
            Ok(Extension::Prepend) => chain.insert(0, canonical),
            Err(violation) => {
                debug!(?key, %violation, "edge toggle rejected");
                return Err(violation.into());
            }
        }
        Ok(Toggle::Added)
    }

    /// Add or remove a permission codename.
    pub fn toggle_permission(&mut self, codename: &str) -> Toggle {
        if let Some(position) = self.permissions.iter().position(|p| p == codename) {
            self.permissions.remove(position);
            Toggle::Removed
        } else {
            self.permissions.push(codename.to_string());
            Toggle::Added
        }
    }

    /// Empty the selection and clear every mark.
    pub fn clear(&mut self) {
        self.selected = SelectedSubgraph::default();
        self.permissions.clear();
        if let Some(graph) = self.graph.as_mut() {
            graph.nodes.iter_mut().for_each(|n| n.marked = false);
            graph.edges.iter_mut().for_each(|e| e.marked = false);
        }
    }

    // ========================================================================
    // COSMETIC FLAGS
    // ========================================================================

    /// Flip `marked` on nodes whose name or label is `name`. Returns the
    /// number of nodes flipped.
    pub fn mark_node(&mut self, name: &str) -> Result<usize, SelectionError> {
        let graph = self.graph_mut()?;
        let mut flipped = 0;
        for node in graph.nodes.iter_mut().filter(|n| n.name == name || n.label == name) {
            node.marked = !node.marked;
            flipped += 1;
        }
        Ok(flipped)
    }

    /// Flip `marked` on every edge of the `key` duplicate group.
    pub fn mark_edge(&mut self, key: EdgeKey) -> Result<usize, SelectionError> {
        let graph = self.graph_mut()?;
        let mut flipped = 0;
        for edge in graph.edges.iter_mut().filter(|e| e.key() == key) {
            edge.marked = !edge.marked;
            flipped += 1;
        }
        self.sync_selected_edges();
        Ok(flipped)
    }

    /// Hover at most one node; `None` clears the hover.
    pub fn hover_node(&mut self, name: Option<&str>) -> Result<(), SelectionError> {
        let graph = self.graph_mut()?;
        let hovered = name.and_then(|name| graph.nodes.iter().position(|n| n.name == name || n.label == name));
        for (position, node) in graph.nodes.iter_mut().enumerate() {
            node.hovered = Some(position) == hovered;
        }
        Ok(())
    }

    /// Hover the first edge of the `key` group; `None` clears the hover.
    pub fn hover_edge(&mut self, key: Option<EdgeKey>) -> Result<(), SelectionError> {
        let graph = self.graph_mut()?;
        let hovered = key.and_then(|key| graph.edges.iter().position(|e| e.key() == key));
        for (position, edge) in graph.edges.iter_mut().enumerate() {
            edge.hovered = Some(position) == hovered;
        }
        self.sync_selected_edges();
        Ok(())
    }

    fn sync_selected_edges(&mut self) {
        let Some(graph) = self.graph.as_ref() else {
            return;
        };
        for selected in self.selected.edges.iter_mut() {
            if let Some(canonical) = graph.edges.iter().find(|e| e.same_relation(selected)) {
                selected.marked = canonical.marked;
                selected.hovered = canonical.hovered;
            }
        }
    }

    // ========================================================================
    // RULES
    // ========================================================================

    /// Best-effort single-hop reconstruction of a fetched rule.
    ///
    /// Only runs on an empty selection. Marks the source node, its first
    /// outgoing edge of `relation_types[0]`, and the target node. Multi-hop
    /// paths are not walked.
    pub fn reconcile_from_rule(
        &mut self,
        source: &str,
        target: &str,
        relation_types: &[String],
    ) -> Option<Reconciliation> {
        if !self.selected.is_empty() {
            debug!("selection not empty, rule not reconciled");
            return None;
        }
        let graph = self.graph.as_mut()?;

        let source_index = graph.nodes.iter().position(|n| n.answers_to(source))?;
        graph.nodes[source_index].marked = true;

        let edge = relation_types.first().and_then(|relation| {
            let position = graph
                .edges
                .iter()
                .position(|e| e.source_index == source_index && &e.relation_type == relation)?;
            graph.edges[position].marked = true;
            Some(graph.edges[position].key())
        });

        let target_index = graph.nodes.iter().position(|n| n.answers_to(target));
        if let Some(index) = target_index {
            graph.nodes[index].marked = true;
        }

        Some(Reconciliation {
            source: source_index,
            edge,
            target: target_index,
        })
    }

    /// Encode the selection, checking that the first and last selected
    /// nodes are the ends of the selected chain.
    pub fn rule_payload(&self) -> Result<RulePayload, CodecError> {
        if self.selected.nodes.len() >= 2 {
            self.check_endpoints()?;
        }
        codec::encode(&self.selected, &self.permissions)
    }

    fn check_endpoints(&self) -> Result<(), CodecError> {
        let (Some(head), Some(tail)) = (self.selected.head(), self.selected.tail()) else {
            return Ok(());
        };
        let (Some(first), Some(last)) = (self.selected.nodes.first(), self.selected.nodes.last()) else {
            return Ok(());
        };

        let id_at = |index: usize| self.graph.as_ref().and_then(|g| g.node(index)).map(|n| n.id());
        if id_at(head) == Some(first.id) && id_at(tail) == Some(last.id) {
            Ok(())
        } else {
            Err(CodecError::EndpointMismatch {
                source_label: first.label.clone(),
                target_label: last.label.clone(),
            })
        }
    }

    /// The selected chain as labelled hops.
    pub fn segments(&self) -> Vec<PathSegment> {
        let Some(graph) = self.graph.as_ref() else {
            return Vec::new();
        };
        self.selected
            .edges
            .iter()
            .filter_map(|edge| {
                let source = graph.node(edge.source_index)?;
                let target = graph.node(edge.target_index)?;
                let incoming = source.source_item.relations().any(|(_, r)| {
                    r.to == target.name
                        && r.relation_type == edge.relation_type
                        && r.direction == Some(INCOMING)
                });
                Some(PathSegment {
                    source: source.label.clone(),
                    relation: edge.relation_type.clone(),
                    direction: if incoming { Direction::From } else { Direction::To },
                    target: target.label.clone(),
                })
            })
            .collect()
    }
}

fn relink(
    selected: &SelectedSubgraph,
    old: Option<&RenderGraph>,
    graph: &RenderGraph,
) -> Option<SelectedSubgraph> {
    let nodes = selected
        .nodes
        .iter()
        .map(|n| graph.node_by_id(n.id).map(|node| node.source_item.clone()))
        .collect::<Option<Vec<_>>>()?;

    // Indices are only stable within one normalization run.
    let reindex = |index: usize| {
        let id = old?.node(index)?.id();
        graph.node_by_id(id).map(|node| node.index)
    };
    let edges = selected
        .edges
        .iter()
        .map(|e| {
            let moved = RenderEdge::new(reindex(e.source_index)?, reindex(e.target_index)?, e.relation_type.as_str());
            graph.edges.iter().find(|c| c.same_relation(&moved)).cloned()
        })
        .collect::<Option<Vec<_>>>()?;
    Some(SelectedSubgraph { nodes, edges })
}
