//! Render graph
//!
//! ```text
//! RawSchemaGraph (from meta-graph endpoint)
//!        │
//!        ▼
//! normalize()  ── ingest (tagged properties) ─► dedup by label
//!        │        resolve relation targets    ─► curvature per duplicate group
//!        ▼
//! RenderGraph (index-stable nodes + edges)  +  NormalizeReport (diagnostics)
//! ```
//!
//! The render graph is rebuilt wholesale on every fetch and is only mutated
//! through the selection state machine.

pub mod normalize;
pub mod types;

pub use normalize::{
    normalize, normalize_descriptors, DanglingPolicy, DanglingRelation, NormalizeReport,
    Normalized, CURVATURE_STEP,
};
pub use types::{EdgeKey, RenderEdge, RenderGraph, RenderNode};
