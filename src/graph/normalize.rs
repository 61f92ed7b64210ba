//! Graph Normalizer
//!
//! Converts a raw schema mapping into a [`RenderGraph`] in three passes:
//!
//! 1. one node per distinct label, indexed by enumeration order
//! 2. one edge per relation target, resolved against node names
//! 3. curvature offsets per duplicate group `(source, target)`
//!
//! The transform is pure: the same input always yields the same indices and
//! offsets.

use std::collections::HashMap;
use std::str::FromStr;

use access_rule_types::{NodeDescriptor, RawSchemaGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{EdgeKey, RenderEdge, RenderGraph, RenderNode};
use crate::error::NormalizeError;

/// Offset between consecutive parallel edges of one duplicate group.
pub const CURVATURE_STEP: u32 = 150;

/// What to do with a relation whose target label is not in the schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingPolicy {
    /// Drop the edge and record a [`DanglingRelation`] diagnostic.
    #[default]
    Skip,
    /// Fail normalization with [`NormalizeError::DanglingRelation`].
    Reject,
}

impl FromStr for DanglingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown dangling policy '{}'", other)),
        }
    }
}

/// A relation dropped because its target does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingRelation {
    pub source_label: String,
    pub property: String,
    pub to: String,
    pub relation_type: String,
}

impl From<DanglingRelation> for NormalizeError {
    fn from(d: DanglingRelation) -> Self {
        NormalizeError::DanglingRelation {
            source_label: d.source_label,
            property: d.property,
            to: d.to,
        }
    }
}

/// Diagnostics collected while normalizing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub dangling: Vec<DanglingRelation>,
    /// Labels whose later entries were dropped as duplicates.
    pub duplicate_labels: Vec<String>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.duplicate_labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub graph: RenderGraph,
    pub report: NormalizeReport,
}

/// Normalize a fetched schema graph.
pub fn normalize(raw: &RawSchemaGraph, policy: DanglingPolicy) -> Result<Normalized, NormalizeError> {
    let entries = raw
        .iter()
        .map(|(key, entry)| Ok((key.to_string(), NodeDescriptor::from_entry(key, entry)?)))
        .collect::<Result<Vec<_>, NormalizeError>>()?;
    build(entries, policy)
}

/// Normalize already-ingested descriptors; each node is named by its label.
pub fn normalize_descriptors(
    descriptors: Vec<NodeDescriptor>,
    policy: DanglingPolicy,
) -> Result<Normalized, NormalizeError> {
    build(
        descriptors.into_iter().map(|d| (d.label.clone(), d)).collect(),
        policy,
    )
}

fn build(
    entries: Vec<(String, NodeDescriptor)>,
    policy: DanglingPolicy,
) -> Result<Normalized, NormalizeError> {
    let mut report = NormalizeReport::default();

    let mut nodes: Vec<RenderNode> = Vec::with_capacity(entries.len());
    for (name, descriptor) in entries {
        if nodes.iter().any(|n| n.label == descriptor.label) {
            warn!(label = %descriptor.label, name = %name, "duplicate schema label dropped");
            report.duplicate_labels.push(descriptor.label);
            continue;
        }
        nodes.push(RenderNode::new(nodes.len(), name, descriptor));
    }

    let mut edges = Vec::new();
    for node in &nodes {
        for (property, target) in node.source_item.relations() {
            match nodes.iter().position(|n| n.name == target.to) {
                Some(target_index) => {
                    edges.push(RenderEdge::new(node.index, target_index, &target.relation_type))
                }
                None => {
                    let dangling = DanglingRelation {
                        source_label: node.label.clone(),
                        property: property.to_string(),
                        to: target.to.clone(),
                        relation_type: target.relation_type.clone(),
                    };
                    if policy == DanglingPolicy::Reject {
                        return Err(dangling.into());
                    }
                    warn!(
                        source = %dangling.source_label,
                        property = %dangling.property,
                        to = %dangling.to,
                        "relation target not in schema, edge skipped"
                    );
                    report.dangling.push(dangling);
                }
            }
        }
    }

    assign_curvature(&mut edges);

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        dangling = report.dangling.len(),
        "schema graph normalized"
    );

    Ok(Normalized {
        graph: RenderGraph { nodes, edges },
        report,
    })
}

fn assign_curvature(edges: &mut [RenderEdge]) {
    let mut seen: HashMap<EdgeKey, u32> = HashMap::new();
    for edge in edges.iter_mut() {
        let count = seen.entry(edge.key()).or_insert(0);
        edge.curvature_offset = *count * CURVATURE_STEP;
        *count += 1;
    }
}
