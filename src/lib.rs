//! Access rule graph widget core.
//!
//! Builds access rules interactively from a schema graph of content types:
//!
//! - [`graph`] normalizes the fetched schema into an index-stable render graph
//! - [`selection`] tracks the rule under construction as a simple path
//! - [`codec`] converts between a selection and the rule payload
//! - [`state`] is the widget reducer, driven by [`events::Event`]s
//! - [`events`] runs the store task and the request watchers
//!
//! Rendering and the host page are out of scope; they dispatch events and
//! read snapshots through [`RuntimeHandle`].

pub mod codec;
pub mod config;
pub mod controls;
pub mod error;
pub mod events;
pub mod graph;
pub mod selection;
pub mod state;
pub mod telemetry;

pub use access_rule_client::{AccessRuleApi, ClientConfig, HttpClient, InMemoryClient, TransportError};
pub use access_rule_types::{AccessRule, NodeDescriptor, NodeList, RawSchemaGraph, RulePayload};

pub use codec::{decode, encode, ContentTypeRef, DecodedRule, PermissionRef};
pub use config::{ConfigError, WidgetConfig};
pub use controls::{AccessRuleControls, MenuState};
pub use error::{
    CodecError, ControlsError, NormalizeError, PathViolation, RuntimeError, SelectionError, TaskError,
};
pub use events::{Dispatcher, Envelope, Event, RequestKind, Runtime, RuntimeHandle, Ticket};
pub use graph::{
    normalize, DanglingPolicy, EdgeKey, NormalizeReport, Normalized, RenderEdge, RenderGraph, RenderNode,
};
pub use selection::{PathSegment, Reconciliation, SelectedSubgraph, SelectionMachine, Toggle};
pub use state::{LastError, WidgetState};
