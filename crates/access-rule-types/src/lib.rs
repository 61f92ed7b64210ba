//! Shared API Types for the access rule graph widget
//!
//! This crate is the SINGLE SOURCE OF TRUTH for every JSON shape crossing the
//! HTTP boundary between the widget and the permissions backend.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐   GET meta-graph/     ┌──────────────────┐
//! │  Permissions     │ ────────────────────► │  Graph widget    │
//! │  backend (REST)  │   GET nodelist/       │  (state core)    │
//! │                  │ ◄──────────────────── │                  │
//! └──────────────────┘   POST access-rules/  └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Raw schema entries are classified ONCE at ingestion into tagged
//!    [`SchemaProperty`] values; nothing downstream inspects JSON types.
//! 2. Enumeration order of the schema mapping is preserved end-to-end.
//! 3. Tagged enums use `#[serde(tag = "kind")]`.

pub mod error;
pub mod rule;
pub mod schema;

pub use error::IngestError;
pub use rule::{AccessRule, RulePayload};
pub use schema::{
    NodeDescriptor, NodeList, RawSchemaGraph, RelationTarget, SchemaProperty,
    DEFAULT_PERMISSIONS_KEY,
};
