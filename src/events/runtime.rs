//! Async Task Runner wiring.
//!
//! [`Runtime::spawn`] starts the store task and one supervised watcher per
//! request kind. The returned [`RuntimeHandle`] is how a host dispatches
//! events, follows snapshots and shuts the widget down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use access_rule_client::{AccessRuleApi, HttpClient, TransportError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::store::Store;
use super::types::{Envelope, Event, RequestKind};
use super::watchers::{spawn_supervised, Watcher};
use crate::config::WidgetConfig;
use crate::error::RuntimeError;
use crate::state::WidgetState;

/// Cheap, cloneable sender of events into the store.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Event>,
}

impl Dispatcher {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    /// Queue an event. Events are applied in the order they are dispatched.
    pub fn dispatch(&self, event: Event) -> Result<(), RuntimeError> {
        self.tx.send(event).map_err(|_| RuntimeError::ShutDown)
    }
}

pub struct Runtime;

impl Runtime {
    /// Start the widget runtime on the current tokio runtime.
    pub fn spawn(config: &WidgetConfig, api: Arc<dyn AccessRuleApi>) -> RuntimeHandle {
        let state = WidgetState::new(config.dangling_policy).with_menu_item(config.active_menu_item.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(state.clone()));
        let (applied_tx, _) = broadcast::channel(config.event_buffer.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = Dispatcher::new(tx);

        let mut requests = HashMap::new();
        let watchers = RequestKind::ALL
            .iter()
            .map(|&kind| {
                let (request_tx, request_rx) = mpsc::unbounded_channel();
                requests.insert(kind, request_tx);
                let watcher = Watcher::new(kind, Arc::clone(&api), dispatcher.clone());
                spawn_supervised(watcher, request_rx, shutdown_rx.clone())
            })
            .collect();

        let store = Store::new(state, rx, snapshot_tx, applied_tx.clone(), shutdown_rx).with_requests(requests);
        let store = tokio::spawn(store.run());

        info!(
            base_url = %config.client.base_url,
            event_buffer = config.event_buffer,
            dangling_policy = ?config.dangling_policy,
            "Widget runtime started"
        );

        RuntimeHandle {
            dispatcher,
            snapshots: snapshot_rx,
            applied: applied_tx,
            shutdown: shutdown_tx,
            store,
            watchers,
        }
    }

    /// Start the runtime against the HTTP backend described by `config`.
    pub fn with_http(config: &WidgetConfig) -> Result<RuntimeHandle, TransportError> {
        let api = HttpClient::new(config.client.clone())?;
        Ok(Self::spawn(config, Arc::new(api)))
    }
}

pub struct RuntimeHandle {
    dispatcher: Dispatcher,
    snapshots: watch::Receiver<Arc<WidgetState>>,
    applied: broadcast::Sender<Envelope>,
    shutdown: watch::Sender<bool>,
    store: JoinHandle<WidgetState>,
    watchers: Vec<JoinHandle<()>>,
}

impl RuntimeHandle {
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn dispatch(&self, event: Event) -> Result<(), RuntimeError> {
        self.dispatcher.dispatch(event)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> Arc<WidgetState> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Follow state snapshots, one per applied event.
    pub fn snapshots(&self) -> watch::Receiver<Arc<WidgetState>> {
        self.snapshots.clone()
    }

    /// Follow applied events. Observers that fall more than the configured
    /// event buffer behind skip ahead; request handling is unaffected.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.applied.subscribe()
    }

    /// Wait until a snapshot satisfies `predicate`, or `timeout` elapses.
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<Arc<WidgetState>>
    where
        F: FnMut(&WidgetState) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let wait = async {
            loop {
                {
                    let current = snapshots.borrow_and_update();
                    if predicate(&**current) {
                        return Some(Arc::clone(&current));
                    }
                }
                if snapshots.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    /// Stop the watchers and the store, applying events already queued.
    ///
    /// Returns the final state. Handler tasks still in flight finish on their
    /// own and their results are discarded.
    pub async fn shutdown(self) -> Result<WidgetState, RuntimeError> {
        self.shutdown.send_replace(true);

        for watcher in self.watchers {
            if let Err(e) = watcher.await {
                warn!(error = ?e, "Watcher supervisor failed during shutdown");
            }
        }

        let state = self
            .store
            .await
            .map_err(|e| RuntimeError::StoreFailed(e.to_string()))?;
        info!("Widget runtime stopped");
        Ok(state)
    }
}
