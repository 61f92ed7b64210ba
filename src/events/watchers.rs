//! Request watchers.
//!
//! One persistent watcher per [`RequestKind`]. The store forwards every
//! applied request of that kind over an unbounded channel; the watcher forks
//! a handler task per occurrence and goes straight back to waiting, so
//! requests of one kind can be in flight concurrently. Handlers call the
//! [`AccessRuleApi`] and dispatch the result event; they never touch state
//! directly.

use std::sync::Arc;
use std::time::Duration;

use access_rule_client::AccessRuleApi;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::runtime::Dispatcher;
use super::types::{Envelope, Event, RequestKind, Ticket};
use crate::error::TaskError;
use crate::state::WidgetState;

/// Restarts allowed before a panicking watcher is abandoned.
const MAX_RESTARTS: u32 = 100;

/// Requests of one kind, shared across watcher restarts.
pub(crate) type RequestQueue = Arc<Mutex<mpsc::UnboundedReceiver<Envelope>>>;

#[derive(Clone)]
pub(crate) struct Watcher {
    kind: RequestKind,
    api: Arc<dyn AccessRuleApi>,
    dispatcher: Dispatcher,
}

impl Watcher {
    pub(crate) fn new(kind: RequestKind, api: Arc<dyn AccessRuleApi>, dispatcher: Dispatcher) -> Self {
        Self { kind, api, dispatcher }
    }

    async fn run(self, requests: RequestQueue, mut shutdown: watch::Receiver<bool>) {
        debug!(kind = %self.kind, "Watcher started");
        // tokio's Mutex does not poison, so a restarted watcher gets the queue back.
        let mut requests = requests.lock().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = requests.recv() => match received {
                    Some(envelope) => self.on_applied(envelope),
                    None => break,
                },
            }
        }

        debug!(kind = %self.kind, "Watcher stopped");
    }

    fn on_applied(&self, envelope: Envelope) {
        if envelope.event.request_kind() != Some(self.kind) {
            return;
        }
        let Some(ticket) = envelope.ticket else {
            return;
        };

        let api = Arc::clone(&self.api);
        let dispatcher = self.dispatcher.clone();
        let kind = self.kind;
        tokio::spawn(async move {
            let result = perform(api.as_ref(), &envelope.event, ticket, &envelope.snapshot).await;
            if let Some(event) = result {
                if let Err(e) = dispatcher.dispatch(event) {
                    debug!(%kind, ticket, error = %e, "result dropped after shutdown");
                }
            }
        });
    }
}

/// Run the side effect for one request and build its result event.
async fn perform(
    api: &dyn AccessRuleApi,
    request: &Event,
    ticket: Ticket,
    snapshot: &WidgetState,
) -> Option<Event> {
    let event = match request {
        Event::FetchMetaGraph => Event::MetaGraphFetched {
            ticket,
            result: api.fetch_meta_graph().await.map_err(TaskError::from),
        },
        Event::FetchNodeList => Event::NodeListFetched {
            ticket,
            result: api.fetch_node_list().await.map_err(TaskError::from),
        },
        Event::SubmitRule => {
            let result = match snapshot.selection.rule_payload() {
                Ok(payload) => api.post_rule(&payload).await.map_err(TaskError::from),
                Err(e) => Err(TaskError::from(e)),
            };
            Event::RuleSubmitted { ticket, result }
        }
        Event::FetchRule { id } => Event::RuleFetched {
            ticket,
            result: api.fetch_rule(*id).await.map_err(TaskError::from),
        },
        _ => return None,
    };
    Some(event)
}

/// Spawn a watcher under a supervisor that restarts it if it panics.
///
/// Returns the supervisor's handle. Handler tasks are not restarted; a
/// panicking handler loses only its own result.
pub(crate) fn spawn_supervised(
    watcher: Watcher,
    requests: mpsc::UnboundedReceiver<Envelope>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let requests: RequestQueue = Arc::new(Mutex::new(requests));

    tokio::spawn(async move {
        let mut restart_count = 0u32;

        loop {
            let task = watcher.clone().run(Arc::clone(&requests), shutdown.clone());

            match tokio::spawn(task).await {
                Ok(()) => break,
                Err(e) => {
                    restart_count += 1;
                    error!(
                        kind = %watcher.kind,
                        error = ?e,
                        restart_count,
                        "Watcher panicked, restarting"
                    );

                    if *shutdown.borrow() {
                        break;
                    }
                    if restart_count > MAX_RESTARTS {
                        error!(kind = %watcher.kind, "Watcher restarted too many times, giving up");
                        break;
                    }

                    let backoff = Duration::from_millis(100 * u64::from(restart_count.min(10)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(kind = %watcher.kind, "Watcher supervisor exited");
    })
}
