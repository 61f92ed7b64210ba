//! End-to-end runtime scenarios against in-process backends.
//!
//! Each test spawns the store and watchers on the test's tokio runtime,
//! dispatches events the way a renderer would and waits on snapshots.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use access_rule_graph::{
    AccessRule, AccessRuleApi, EdgeKey, Event, InMemoryClient, NodeList, RawSchemaGraph, RenderEdge,
    RequestKind, Runtime, RuntimeError, RulePayload, TransportError, WidgetConfig, WidgetState,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(2);

fn schema() -> RawSchemaGraph {
    serde_json::from_value(json!({
        "CustomerNode": {"id": 1, "app_label": "shop", "model_name": "customer",
            "orders": [{"to": "OrderNode", "relation_type": "OWNS"}],
            "returns": [{"to": "OrderNode", "relation_type": "RETURNED"}]},
        "OrderNode": {"id": 2, "app_label": "orders", "model_name": "order",
            "items": [{"to": "ProductNode", "relation_type": "CONTAINS"}]},
        "ProductNode": {"id": 3, "app_label": "shop", "model_name": "product"}
    }))
    .unwrap()
}

fn node_list() -> NodeList {
    serde_json::from_value(json!({
        "CustomerNode": ["orders", "returns"],
        "OrderNode": ["items"],
        "ProductNode": []
    }))
    .unwrap()
}

fn has_graph(state: &WidgetState) -> bool {
    state.graph().is_some()
}

#[tokio::test]
async fn test_load_select_and_submit() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api.clone());

    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    let state = runtime.wait_for(WAIT, has_graph).await.unwrap();
    let graph = state.graph().unwrap();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 3);
    assert_eq!(graph.duplicate_groups()[&EdgeKey::new(0, 1)].len(), 2);

    for event in [
        Event::ToggleNode { id: 1 },
        Event::ToggleNode { id: 2 },
        Event::ToggleEdge {
            edge: RenderEdge::new(0, 1, "OWNS"),
        },
        Event::TogglePermission {
            codename: "view_order".into(),
        },
        Event::SubmitRule,
    ] {
        runtime.dispatch(event).unwrap();
    }

    let state = runtime
        .wait_for(WAIT, |s| s.last_submitted.is_some())
        .await
        .unwrap();
    let submitted = state.last_submitted.clone().unwrap();
    assert_eq!(
        submitted.payload(),
        RulePayload {
            ctype_source: "shop.customer".into(),
            ctype_target: "orders.order".into(),
            relation_types: vec!["OWNS".into()],
            permissions: vec!["orders.view_order".into()],
        }
    );
    assert_eq!(api.rules().len(), 1);
    assert!(state.last_error.is_none());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_submit_uses_selection_at_dispatch_time() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api.clone());
    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    runtime.wait_for(WAIT, has_graph).await.unwrap();

    runtime.dispatch(Event::ToggleNode { id: 2 }).unwrap();
    runtime.dispatch(Event::ToggleNode { id: 3 }).unwrap();
    runtime.dispatch(Event::SubmitRule).unwrap();
    runtime.dispatch(Event::ClearSelection).unwrap();

    let state = runtime
        .wait_for(WAIT, |s| s.last_submitted.is_some())
        .await
        .unwrap();
    assert_eq!(
        state.last_submitted.as_ref().unwrap().ctype_target,
        "shop.product"
    );
    assert!(state.selection.selected().is_empty());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_submit_without_selection_is_a_validation_error() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api.clone());

    runtime.dispatch(Event::SubmitRule).unwrap();

    let state = runtime
        .wait_for(WAIT, |s| s.last_error.is_some())
        .await
        .unwrap();
    let error = state.last_error.clone().unwrap();
    assert_eq!(error.kind, Some(RequestKind::SubmitRule));
    assert_eq!(
        error.message,
        "A rule needs a source and a target node, 0 selected"
    );
    assert!(api.rules().is_empty());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_transport_failure_surfaces_generic_message() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    api.fail_with(TransportError::Http {
        status: 502,
        url: "http://localhost:8000/meta-graph/".into(),
    });
    let runtime = Runtime::spawn(&WidgetConfig::default(), api.clone());

    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    let state = runtime
        .wait_for(WAIT, |s| s.last_error.is_some())
        .await
        .unwrap();
    assert_eq!(
        state.last_error.as_ref().unwrap().message,
        "Bad response from the server"
    );
    assert!(state.graph().is_none());

    // A later successful fetch clears the error.
    api.recover();
    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    let state = runtime.wait_for(WAIT, has_graph).await.unwrap();
    assert!(state.last_error.is_none());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetched_rule_marks_single_hop() {
    let mut existing = AccessRule::from(RulePayload {
        ctype_source: "shop.customer".into(),
        ctype_target: "orders.order".into(),
        relation_types: vec!["RETURNED".into()],
        permissions: vec!["orders.change_order".into()],
    });
    existing.id = Some(42);
    let api = Arc::new(InMemoryClient::new(schema(), node_list()).with_rule(existing));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api);

    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    runtime.wait_for(WAIT, has_graph).await.unwrap();
    runtime.dispatch(Event::FetchRule { id: 42 }).unwrap();

    let state = runtime
        .wait_for(WAIT, |s| s.loaded_rule.is_some())
        .await
        .unwrap();
    let graph = state.graph().unwrap();
    let marked_edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.marked)
        .map(|e| e.relation_type.as_str())
        .collect();
    assert_eq!(marked_edges, vec!["RETURNED"]);
    assert!(graph.nodes[0].marked && graph.nodes[1].marked);
    assert!(!graph.nodes[2].marked);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_controls_follow_node_list() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api);

    runtime.dispatch(Event::FetchNodeList).unwrap();
    runtime
        .wait_for(WAIT, |s| !s.controls.node_relations.is_empty())
        .await
        .unwrap();
    runtime
        .dispatch(Event::SetTargetNode {
            label: "OrderNode".into(),
        })
        .unwrap();
    runtime
        .dispatch(Event::SetSourceNode {
            label: "CustomerNode".into(),
        })
        .unwrap();
    runtime
        .dispatch(Event::SetActiveMenuItem {
            item: "query".into(),
        })
        .unwrap();

    let state = runtime
        .wait_for(WAIT, |s| s.menu.active_item == "query")
        .await
        .unwrap();
    assert_eq!(state.controls.source_node.as_deref(), Some("CustomerNode"));
    assert_eq!(state.controls.target_node, None);
    assert_eq!(state.controls.relation_choices(), &["orders".to_string(), "returns".to_string()]);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_request_survives_a_flood_of_other_events() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default().event_buffer(4), api);

    runtime.dispatch(Event::FetchNodeList).unwrap();
    for i in 0..50 {
        runtime
            .dispatch(Event::SetActiveMenuItem {
                item: format!("item {}", i),
            })
            .unwrap();
    }
    runtime.dispatch(Event::FetchMetaGraph).unwrap();

    let state = runtime
        .wait_for(WAIT, |s| !s.controls.node_relations.is_empty() && s.graph().is_some())
        .await
        .unwrap();
    assert!(!state.requests.is_pending(RequestKind::NodeList));
    assert!(!state.requests.is_pending(RequestKind::MetaGraph));
    assert!(state.last_error.is_none());

    runtime.shutdown().await.unwrap();
}

/// Backend whose first meta-graph response is slow and stale.
struct SlowFirstSchema {
    calls: AtomicUsize,
    stale: RawSchemaGraph,
    fresh: RawSchemaGraph,
}

#[async_trait]
impl AccessRuleApi for SlowFirstSchema {
    async fn fetch_meta_graph(&self) -> access_rule_client::Result<RawSchemaGraph> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(self.stale.clone())
        } else {
            Ok(self.fresh.clone())
        }
    }

    async fn fetch_node_list(&self) -> access_rule_client::Result<NodeList> {
        Ok(NodeList::default())
    }

    async fn post_rule(&self, payload: &RulePayload) -> access_rule_client::Result<AccessRule> {
        Ok(AccessRule::from(payload.clone()))
    }

    async fn fetch_rule(&self, id: i64) -> access_rule_client::Result<AccessRule> {
        Err(TransportError::Http {
            status: 404,
            url: format!("access-rules/{}", id),
        })
    }
}

#[tokio::test]
async fn test_stale_result_does_not_overwrite_newer_one() {
    let api = Arc::new(SlowFirstSchema {
        calls: AtomicUsize::new(0),
        stale: serde_json::from_value(json!({"Old": {"id": 9}})).unwrap(),
        fresh: schema(),
    });
    let runtime = Runtime::spawn(&WidgetConfig::default(), api.clone());

    runtime.dispatch(Event::FetchMetaGraph).unwrap();
    runtime.dispatch(Event::FetchMetaGraph).unwrap();

    runtime.wait_for(WAIT, has_graph).await.unwrap();
    // Let the slow first response arrive.
    tokio::time::sleep(Duration::from_millis(400)).await;

    let state = runtime.snapshot();
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    assert_eq!(state.graph().unwrap().nodes.len(), 3);
    assert!(!state.requests.is_pending(RequestKind::MetaGraph));

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatch_after_shutdown_fails() {
    let api = Arc::new(InMemoryClient::new(schema(), node_list()));
    let runtime = Runtime::spawn(&WidgetConfig::default(), api);
    let dispatcher = runtime.dispatcher();

    dispatcher
        .dispatch(Event::TogglePermission {
            codename: "view".into(),
        })
        .unwrap();
    let state = runtime.shutdown().await.unwrap();

    assert_eq!(state.selection.permissions(), &["view".to_string()]);
    assert_eq!(
        dispatcher.dispatch(Event::ClearSelection),
        Err(RuntimeError::ShutDown)
    );
}
