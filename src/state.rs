//! Widget state and its reducer.
//!
//! [`WidgetState::apply`] is the only state transition. It is synchronous
//! and pure apart from logging; the store task calls it once per event in
//! dispatch order.

use std::collections::HashMap;

use access_rule_types::AccessRule;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::controls::{AccessRuleControls, MenuState};
use crate::error::TaskError;
use crate::events::{Event, RequestKind, Ticket};
use crate::graph::{normalize, DanglingPolicy, EdgeKey, NormalizeReport, RenderGraph};
use crate::selection::{Reconciliation, SelectionMachine};

/// Latest-wins bookkeeping for request tickets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tickets {
    issued: HashMap<RequestKind, Ticket>,
    applied: HashMap<RequestKind, Ticket>,
}

impl Tickets {
    /// Next ticket for `kind`, starting at 1.
    pub fn issue(&mut self, kind: RequestKind) -> Ticket {
        let ticket = self.issued.entry(kind).or_insert(0);
        *ticket += 1;
        *ticket
    }

    /// Record a result; false when a newer result of the kind was already applied.
    pub fn accept(&mut self, kind: RequestKind, ticket: Ticket) -> bool {
        match self.applied.get(&kind) {
            Some(&newest) if ticket <= newest => false,
            _ => {
                self.applied.insert(kind, ticket);
                true
            }
        }
    }

    /// True while the newest request of `kind` has no applied result.
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        let issued = self.issued.get(&kind).copied().unwrap_or(0);
        let applied = self.applied.get(&kind).copied().unwrap_or(0);
        issued > applied
    }
}

/// The last user-facing failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    /// Request kind that failed; `None` for rejected interactions.
    pub kind: Option<RequestKind>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetState {
    pub selection: SelectionMachine,
    pub report: NormalizeReport,
    pub controls: AccessRuleControls,
    pub menu: MenuState,
    pub loaded_rule: Option<AccessRule>,
    pub reconciled: Option<Reconciliation>,
    pub last_submitted: Option<AccessRule>,
    pub last_error: Option<LastError>,
    pub requests: Tickets,
    pub dangling_policy: DanglingPolicy,
}

impl WidgetState {
    pub fn new(dangling_policy: DanglingPolicy) -> Self {
        Self {
            dangling_policy,
            ..Default::default()
        }
    }

    pub fn with_menu_item(mut self, item: impl Into<String>) -> Self {
        self.menu.set_active_item(item);
        self
    }

    pub fn graph(&self) -> Option<&RenderGraph> {
        self.selection.graph()
    }

    /// Apply one event. Returns the ticket issued for request events.
    pub fn apply(&mut self, event: &Event) -> Option<Ticket> {
        if let Some(kind) = event.request_kind() {
            let ticket = self.requests.issue(kind);
            debug!(%kind, ticket, "request issued");
            return Some(ticket);
        }

        if let Some((kind, ticket)) = event.result_of() {
            if !self.requests.accept(kind, ticket) {
                match event {
                    Event::RuleSubmitted { result: Ok(rule), .. } => {
                        info!(id = ?rule.id, ticket, "access rule created by a superseded submit");
                    }
                    _ => debug!(%kind, ticket, "stale result dropped"),
                }
                return None;
            }
        }

        match event {
            Event::MetaGraphFetched { result, .. } => {
                let outcome = result.as_ref().map_err(Clone::clone).and_then(|raw| {
                    normalize(raw, self.dangling_policy).map_err(|e| TaskError::Validation {
                        message: e.to_string(),
                    })
                });
                match outcome {
                    Ok(normalized) => {
                        info!(
                            nodes = normalized.graph.nodes.len(),
                            edges = normalized.graph.edges.len(),
                            "schema graph loaded"
                        );
                        self.selection.replace_graph(normalized.graph);
                        self.report = normalized.report;
                        self.reconcile_loaded_rule();
                        self.resolve(RequestKind::MetaGraph);
                    }
                    Err(e) => self.fail(RequestKind::MetaGraph, &e),
                }
            }
            Event::NodeListFetched { result, .. } => match result {
                Ok(list) => {
                    self.controls.set_node_list(list.clone());
                    self.resolve(RequestKind::NodeList);
                }
                Err(e) => self.fail(RequestKind::NodeList, e),
            },
            Event::RuleSubmitted { result, .. } => match result {
                Ok(rule) => {
                    info!(id = ?rule.id, source = %rule.ctype_source, target = %rule.ctype_target, "access rule created");
                    self.last_submitted = Some(rule.clone());
                    self.resolve(RequestKind::SubmitRule);
                }
                Err(e) => self.fail(RequestKind::SubmitRule, e),
            },
            Event::RuleFetched { result, .. } => match result {
                Ok(rule) => self.load_rule(rule),
                Err(e) => self.fail(RequestKind::FetchRule, e),
            },

            Event::ToggleNode { id } => {
                let result = self.selection.toggle_node(*id).map(drop);
                self.interaction(event, result);
            }
            Event::ToggleEdge { edge } => {
                let result = self.selection.toggle_edge(edge).map(drop);
                self.interaction(event, result);
            }
            Event::MarkNode { name } => {
                let result = self.selection.mark_node(name).map(drop);
                self.interaction(event, result);
            }
            Event::MarkEdge {
                source_index,
                target_index,
            } => {
                let key = EdgeKey::new(*source_index, *target_index);
                let result = self.selection.mark_edge(key).map(drop);
                self.interaction(event, result);
            }
            Event::HoverNode { name } => {
                let result = self.selection.hover_node(name.as_deref());
                self.interaction(event, result);
            }
            Event::HoverEdge { key } => {
                let result = self.selection.hover_edge(*key);
                self.interaction(event, result);
            }
            Event::TogglePermission { codename } => {
                self.selection.toggle_permission(codename);
            }
            Event::ClearSelection => {
                self.selection.clear();
                self.reconciled = None;
            }

            Event::SetSourceNode { label } => {
                let result = self.controls.set_source_node(label);
                self.interaction(event, result);
            }
            Event::SetTargetNode { label } => {
                let result = self.controls.set_target_node(label);
                self.interaction(event, result);
            }
            Event::SetActiveMenuItem { item } => self.menu.set_active_item(item.as_str()),

            Event::FetchMetaGraph
            | Event::FetchNodeList
            | Event::SubmitRule
            | Event::FetchRule { .. } => {}
        }
        None
    }

    fn load_rule(&mut self, rule: &AccessRule) {
        self.loaded_rule = Some(rule.clone());
        match codec::decode(rule) {
            Ok(decoded) => {
                self.reconciled = self.selection.reconcile_from_rule(
                    &decoded.source.to_string(),
                    &decoded.target.to_string(),
                    &decoded.relation_types,
                );
                debug!(id = ?rule.id, reconciled = ?self.reconciled, "access rule loaded");
                self.resolve(RequestKind::FetchRule);
            }
            Err(e) => self.fail(RequestKind::FetchRule, &TaskError::from(e)),
        }
    }

    /// Reconcile a rule that arrived before there was a graph to mark.
    fn reconcile_loaded_rule(&mut self) {
        if self.reconciled.is_some() {
            return;
        }
        let Some(decoded) = self.loaded_rule.as_ref().and_then(|rule| codec::decode(rule).ok()) else {
            return;
        };
        self.reconciled = self.selection.reconcile_from_rule(
            &decoded.source.to_string(),
            &decoded.target.to_string(),
            &decoded.relation_types,
        );
        if self.reconciled.is_some() {
            debug!(reconciled = ?self.reconciled, "loaded access rule reconciled with new graph");
        }
    }

    fn interaction<E: std::fmt::Display>(&mut self, event: &Event, result: Result<(), E>) {
        match result {
            Ok(()) => {
                if matches!(&self.last_error, Some(LastError { kind: None, .. })) {
                    self.last_error = None;
                }
            }
            Err(e) => {
                debug!(event = event.name(), error = %e, "interaction rejected");
                self.last_error = Some(LastError {
                    kind: None,
                    message: e.to_string(),
                });
            }
        }
    }

    fn resolve(&mut self, kind: RequestKind) {
        if matches!(&self.last_error, Some(LastError { kind: Some(k), .. }) if *k == kind) {
            self.last_error = None;
        }
    }

    fn fail(&mut self, kind: RequestKind, e: &TaskError) {
        match e {
            TaskError::Transport { .. } => error!(%kind, error = %e, "request failed"),
            TaskError::Validation { .. } => warn!(%kind, error = %e, "request rejected"),
        }
        self.last_error = Some(LastError {
            kind: Some(kind),
            message: e.user_message(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RenderEdge;
    use access_rule_types::{RawSchemaGraph, RulePayload};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tracing_test::traced_test;

    fn schema() -> RawSchemaGraph {
        serde_json::from_value(json!({
            "Customer": {"id": 1, "app_label": "shop", "model_name": "customer",
                "orders": [{"to": "Order", "relation_type": "OWNS"}]},
            "Order": {"id": 2, "app_label": "orders", "model_name": "order"}
        }))
        .unwrap()
    }

    fn loaded() -> WidgetState {
        let mut state = WidgetState::default();
        let ticket = state.apply(&Event::FetchMetaGraph).unwrap();
        state.apply(&Event::MetaGraphFetched {
            ticket,
            result: Ok(schema()),
        });
        state
    }

    #[test]
    fn test_tickets_are_latest_wins() {
        let mut tickets = Tickets::default();
        let first = tickets.issue(RequestKind::MetaGraph);
        let second = tickets.issue(RequestKind::MetaGraph);
        assert_eq!((first, second), (1, 2));
        assert_eq!(tickets.issue(RequestKind::NodeList), 1);

        assert!(tickets.accept(RequestKind::MetaGraph, second));
        assert!(!tickets.accept(RequestKind::MetaGraph, first));
        assert!(!tickets.is_pending(RequestKind::MetaGraph));
        assert!(tickets.is_pending(RequestKind::NodeList));
    }

    #[test]
    fn test_meta_graph_result_installs_graph() {
        let state = loaded();
        assert_eq!(state.graph().unwrap().nodes.len(), 2);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_stale_meta_graph_result_is_dropped() {
        let mut state = WidgetState::default();
        let old = state.apply(&Event::FetchMetaGraph).unwrap();
        let new = state.apply(&Event::FetchMetaGraph).unwrap();

        state.apply(&Event::MetaGraphFetched {
            ticket: new,
            result: Ok(schema()),
        });
        state.apply(&Event::MetaGraphFetched {
            ticket: old,
            result: Ok(RawSchemaGraph::default()),
        });

        assert_eq!(state.graph().unwrap().nodes.len(), 2);
    }

    #[test]
    fn test_transport_failure_sets_generic_message() {
        let mut state = WidgetState::default();
        let ticket = state.apply(&Event::FetchNodeList).unwrap();
        state.apply(&Event::NodeListFetched {
            ticket,
            result: Err(TaskError::Transport {
                message: "HTTP 500".into(),
                status: Some(500),
            }),
        });

        assert_eq!(
            state.last_error,
            Some(LastError {
                kind: Some(RequestKind::NodeList),
                message: "Bad response from the server".into(),
            })
        );

        let ticket = state.apply(&Event::FetchNodeList).unwrap();
        state.apply(&Event::NodeListFetched {
            ticket,
            result: Ok(Default::default()),
        });
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn test_rejected_toggle_is_reported() {
        let mut state = WidgetState::default();
        state.apply(&Event::ToggleNode { id: 1 });
        assert_eq!(state.last_error.unwrap().message, "No schema graph loaded");
    }

    #[test]
    fn test_toggle_events_drive_selection() {
        let mut state = loaded();
        state.apply(&Event::ToggleNode { id: 1 });
        state.apply(&Event::ToggleNode { id: 2 });
        state.apply(&Event::ToggleEdge {
            edge: RenderEdge::new(0, 1, "OWNS"),
        });
        state.apply(&Event::TogglePermission {
            codename: "view".into(),
        });

        let payload = state.selection.rule_payload().unwrap();
        assert_eq!(payload.permissions, vec!["orders.view"]);

        state.apply(&Event::ClearSelection);
        assert!(state.selection.selected().is_empty());
    }

    #[test]
    fn test_fetched_rule_is_reconciled() {
        let mut state = loaded();
        let ticket = state.apply(&Event::FetchRule { id: 5 }).unwrap();
        let mut rule = AccessRule::from(RulePayload {
            ctype_source: "shop.customer".into(),
            ctype_target: "orders.order".into(),
            relation_types: vec!["OWNS".into()],
            permissions: vec!["orders.view".into()],
        });
        rule.id = Some(5);

        state.apply(&Event::RuleFetched {
            ticket,
            result: Ok(rule.clone()),
        });

        assert_eq!(state.loaded_rule, Some(rule));
        assert_eq!(
            state.reconciled,
            Some(Reconciliation {
                source: 0,
                edge: Some(EdgeKey::new(0, 1)),
                target: Some(1),
            })
        );
    }

    #[test]
    fn test_malformed_fetched_rule_is_a_validation_error() {
        let mut state = loaded();
        let ticket = state.apply(&Event::FetchRule { id: 5 }).unwrap();
        state.apply(&Event::RuleFetched {
            ticket,
            result: Ok(AccessRule::from(RulePayload {
                ctype_source: "customer".into(),
                ctype_target: "orders.order".into(),
                relation_types: vec![],
                permissions: vec![],
            })),
        });

        let error = state.last_error.unwrap();
        assert_eq!(error.kind, Some(RequestKind::FetchRule));
        assert!(error.message.contains("Malformed content type"));
    }

    fn owns_rule(id: i64) -> AccessRule {
        let mut rule = AccessRule::from(RulePayload {
            ctype_source: "shop.customer".into(),
            ctype_target: "orders.order".into(),
            relation_types: vec!["OWNS".into()],
            permissions: vec!["orders.view".into()],
        });
        rule.id = Some(id);
        rule
    }

    #[test]
    fn test_rule_fetched_before_graph_is_reconciled_on_load() {
        let mut state = WidgetState::default();
        let ticket = state.apply(&Event::FetchRule { id: 5 }).unwrap();
        state.apply(&Event::RuleFetched {
            ticket,
            result: Ok(owns_rule(5)),
        });
        assert!(state.loaded_rule.is_some());
        assert_eq!(state.reconciled, None);

        let ticket = state.apply(&Event::FetchMetaGraph).unwrap();
        state.apply(&Event::MetaGraphFetched {
            ticket,
            result: Ok(schema()),
        });

        assert_eq!(
            state.reconciled,
            Some(Reconciliation {
                source: 0,
                edge: Some(EdgeKey::new(0, 1)),
                target: Some(1),
            })
        );
        let graph = state.graph().unwrap();
        assert!(graph.nodes.iter().all(|n| n.marked));
        assert!(graph.edges[0].marked);
    }

    #[test]
    #[traced_test]
    fn test_superseded_submit_still_logs_created_rule() {
        let mut state = loaded();
        let old = state.apply(&Event::SubmitRule).unwrap();
        let new = state.apply(&Event::SubmitRule).unwrap();

        state.apply(&Event::RuleSubmitted {
            ticket: new,
            result: Ok(owns_rule(8)),
        });
        state.apply(&Event::RuleSubmitted {
            ticket: old,
            result: Ok(owns_rule(7)),
        });

        assert_eq!(state.last_submitted.unwrap().id, Some(8));
        assert!(logs_contain("access rule created by a superseded submit"));
        assert!(logs_contain("id=Some(7)"));
    }
}
