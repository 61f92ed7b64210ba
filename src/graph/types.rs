//! Render graph types.

use std::collections::BTreeMap;

use access_rule_types::NodeDescriptor;
use serde::{Deserialize, Serialize};

/// Identity of an edge for selection and duplicate grouping.
///
/// Direction-sensitive: `(a, b)` and `(b, a)` are different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: usize,
    pub target: usize,
}

impl EdgeKey {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    /// Position in the node list, stable for one normalization run.
    pub index: usize,
    /// Key of the schema entry; relation targets resolve against it.
    pub name: String,
    pub label: String,
    pub marked: bool,
    pub hovered: bool,
    pub source_item: NodeDescriptor,
}

impl RenderNode {
    pub fn new(index: usize, name: impl Into<String>, source_item: NodeDescriptor) -> Self {
        Self {
            index,
            name: name.into(),
            label: source_item.label.clone(),
            marked: false,
            hovered: false,
            source_item,
        }
    }

    pub fn id(&self) -> i64 {
        self.source_item.id
    }

    /// Matches by entry name, label, or `"app_label.model_name"`.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.source_item.answers_to(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub source_index: usize,
    pub target_index: usize,
    pub relation_type: String,
    /// Distinguishes parallel edges: `0, 150, 300, …` within a duplicate group.
    pub curvature_offset: u32,
    pub marked: bool,
    pub hovered: bool,
}

impl RenderEdge {
    pub fn new(source_index: usize, target_index: usize, relation_type: impl Into<String>) -> Self {
        Self {
            source_index,
            target_index,
            relation_type: relation_type.into(),
            curvature_offset: 0,
            marked: false,
            hovered: false,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source_index, self.target_index)
    }

    /// Same key and relation type; display flags are ignored.
    pub fn same_relation(&self, other: &RenderEdge) -> bool {
        self.key() == other.key() && self.relation_type == other.relation_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

impl RenderGraph {
    pub fn node(&self, index: usize) -> Option<&RenderNode> {
        self.nodes.get(index)
    }

    pub fn node_by_id(&self, id: i64) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn edges_between(&self, key: EdgeKey) -> impl Iterator<Item = &RenderEdge> {
        self.edges.iter().filter(move |e| e.key() == key)
    }

    pub fn outgoing(&self, index: usize) -> impl Iterator<Item = &RenderEdge> {
        self.edges.iter().filter(move |e| e.source_index == index)
    }

    /// The graph's own copy of `edge`: same key and relation type when
    /// present, otherwise the first edge sharing the key.
    pub fn canonical_edge(&self, edge: &RenderEdge) -> Option<&RenderEdge> {
        self.edges
            .iter()
            .find(|e| e.same_relation(edge))
            .or_else(|| self.edges_between(edge.key()).next())
    }

    /// Duplicate groups: keys shared by more than one edge, with edge positions.
    pub fn duplicate_groups(&self) -> BTreeMap<EdgeKey, Vec<usize>> {
        let mut groups: BTreeMap<EdgeKey, Vec<usize>> = BTreeMap::new();
        for (position, edge) in self.edges.iter().enumerate() {
            groups.entry(edge.key()).or_default().push(position);
        }
        groups.retain(|_, members| members.len() > 1);
        groups
    }
}
