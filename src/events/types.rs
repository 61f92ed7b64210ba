//! Widget events.
//!
//! Everything that changes [`WidgetState`] is an [`Event`]: user
//! interactions, requests for side effects, and the results those side
//! effects produce. Result events carry the [`Ticket`] of the request they
//! answer so stale results can be dropped.

use std::sync::Arc;

use access_rule_types::{AccessRule, NodeList, RawSchemaGraph};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::graph::{EdgeKey, RenderEdge};
use crate::state::WidgetState;

/// Per-kind request sequence number, assigned when the request is applied.
pub type Ticket = u64;

/// Side-effecting request kinds, one watcher each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    MetaGraph,
    NodeList,
    SubmitRule,
    FetchRule,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::MetaGraph,
        RequestKind::NodeList,
        RequestKind::SubmitRule,
        RequestKind::FetchRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::MetaGraph => "meta_graph",
            RequestKind::NodeList => "node_list",
            RequestKind::SubmitRule => "submit_rule",
            RequestKind::FetchRule => "fetch_rule",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Requests
    FetchMetaGraph,
    FetchNodeList,
    /// Encode the selection as it is when this event is applied, then post it.
    SubmitRule,
    FetchRule { id: i64 },

    // Results
    MetaGraphFetched {
        ticket: Ticket,
        result: Result<RawSchemaGraph, TaskError>,
    },
    NodeListFetched {
        ticket: Ticket,
        result: Result<NodeList, TaskError>,
    },
    RuleSubmitted {
        ticket: Ticket,
        result: Result<AccessRule, TaskError>,
    },
    RuleFetched {
        ticket: Ticket,
        result: Result<AccessRule, TaskError>,
    },

    // Selection
    ToggleNode { id: i64 },
    ToggleEdge { edge: RenderEdge },
    MarkNode { name: String },
    MarkEdge { source_index: usize, target_index: usize },
    HoverNode { name: Option<String> },
    HoverEdge { key: Option<EdgeKey> },
    TogglePermission { codename: String },
    ClearSelection,

    // Controls
    SetSourceNode { label: String },
    SetTargetNode { label: String },
    SetActiveMenuItem { item: String },
}

impl Event {
    /// The request kind this event asks for, if it is a request.
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Event::FetchMetaGraph => Some(RequestKind::MetaGraph),
            Event::FetchNodeList => Some(RequestKind::NodeList),
            Event::SubmitRule => Some(RequestKind::SubmitRule),
            Event::FetchRule { .. } => Some(RequestKind::FetchRule),
            _ => None,
        }
    }

    /// The request kind and ticket this event answers, if it is a result.
    pub fn result_of(&self) -> Option<(RequestKind, Ticket)> {
        match self {
            Event::MetaGraphFetched { ticket, .. } => Some((RequestKind::MetaGraph, *ticket)),
            Event::NodeListFetched { ticket, .. } => Some((RequestKind::NodeList, *ticket)),
            Event::RuleSubmitted { ticket, .. } => Some((RequestKind::SubmitRule, *ticket)),
            Event::RuleFetched { ticket, .. } => Some((RequestKind::FetchRule, *ticket)),
            _ => None,
        }
    }

    /// Event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::FetchMetaGraph => "fetch_meta_graph",
            Event::FetchNodeList => "fetch_node_list",
            Event::SubmitRule => "submit_rule",
            Event::FetchRule { .. } => "fetch_rule",
            Event::MetaGraphFetched { .. } => "meta_graph_fetched",
            Event::NodeListFetched { .. } => "node_list_fetched",
            Event::RuleSubmitted { .. } => "rule_submitted",
            Event::RuleFetched { .. } => "rule_fetched",
            Event::ToggleNode { .. } => "toggle_node",
            Event::ToggleEdge { .. } => "toggle_edge",
            Event::MarkNode { .. } => "mark_node",
            Event::MarkEdge { .. } => "mark_edge",
            Event::HoverNode { .. } => "hover_node",
            Event::HoverEdge { .. } => "hover_edge",
            Event::TogglePermission { .. } => "toggle_permission",
            Event::ClearSelection => "clear_selection",
            Event::SetSourceNode { .. } => "set_source_node",
            Event::SetTargetNode { .. } => "set_target_node",
            Event::SetActiveMenuItem { .. } => "set_active_menu_item",
        }
    }
}

/// An applied event, broadcast after the state transition.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: Event,
    /// Set for request events.
    pub ticket: Option<Ticket>,
    /// State right after `event` was applied.
    pub snapshot: Arc<WidgetState>,
}
