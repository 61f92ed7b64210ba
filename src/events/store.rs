//! Single-writer store task.
//!
//! The store owns [`WidgetState`] and applies events strictly in dispatch
//! order. After each transition it publishes a read-only snapshot on a
//! `watch` channel (for renderers), forwards applied requests to the
//! watcher of their kind, and broadcasts every applied event with that
//! snapshot (for observers).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::types::{Envelope, Event, RequestKind};
use crate::state::WidgetState;

pub(crate) struct Store {
    state: WidgetState,
    receiver: mpsc::UnboundedReceiver<Event>,
    snapshots: watch::Sender<Arc<WidgetState>>,
    applied: broadcast::Sender<Envelope>,
    requests: HashMap<RequestKind, mpsc::UnboundedSender<Envelope>>,
    shutdown: watch::Receiver<bool>,
}

impl Store {
    pub(crate) fn new(
        state: WidgetState,
        receiver: mpsc::UnboundedReceiver<Event>,
        snapshots: watch::Sender<Arc<WidgetState>>,
        applied: broadcast::Sender<Envelope>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            receiver,
            snapshots,
            applied,
            requests: HashMap::new(),
            shutdown,
        }
    }

    /// Route applied requests to one queue per kind.
    pub(crate) fn with_requests(mut self, requests: HashMap<RequestKind, mpsc::UnboundedSender<Envelope>>) -> Self {
        self.requests = requests;
        self
    }

    /// Apply events until shutdown is signalled or every dispatcher is gone.
    ///
    /// Events already queued at shutdown are still applied. Returns the final
    /// state.
    pub(crate) async fn run(mut self) -> WidgetState {
        info!("Widget store started");
        let mut applied = 0u64;

        loop {
            tokio::select! {
                biased;
                event = self.receiver.recv() => match event {
                    Some(event) => {
                        self.apply(event);
                        applied += 1;
                    }
                    None => break,
                },
                _ = self.shutdown.changed() => {
                    while let Ok(event) = self.receiver.try_recv() {
                        self.apply(event);
                        applied += 1;
                    }
                    break;
                }
            }
        }

        info!(events = applied, "Widget store stopped");
        self.state
    }

    fn apply(&mut self, event: Event) {
        let ticket = self.state.apply(&event);
        debug!(event = event.name(), ?ticket, "event applied");

        let snapshot = Arc::new(self.state.clone());
        self.snapshots.send_replace(Arc::clone(&snapshot));
        let envelope = Envelope {
            event,
            ticket,
            snapshot,
        };

        if let Some(kind) = envelope.event.request_kind() {
            if let Some(queue) = self.requests.get(&kind) {
                if queue.send(envelope.clone()).is_err() {
                    warn!(%kind, ?ticket, "watcher gone, request not handled");
                }
            }
        }
        // No subscribers is not an error.
        let _ = self.applied.send(envelope);
    }
}
