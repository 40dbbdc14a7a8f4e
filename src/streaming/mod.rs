//! Program event subscriptions
//!
//! Each subscription is one websocket `logsSubscribe` task forwarding the
//! decoded events of the selected kind into an unbounded channel. The
//! registry hands out a [`SubscriptionHandle`] per subscription; dropping the
//! receiver or calling [`EventSubscriptions::unsubscribe`] ends the task.

#[cfg(feature = "ws-stream")]
pub mod websocket_stream;

use crate::curve::events::events_from_logs;
use crate::curve::{EventKind, PumpEvent};
use crate::errors::EngineError;
use crate::observability::metric_names;
use dashmap::DashMap;
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long `unsubscribe` waits for the task to close its websocket
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which events a subscription forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Any,
    Only(EventKind),
}

impl EventFilter {
    pub fn matches(&self, event: &PumpEvent) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Only(kind) => event.kind() == *kind,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EventFilter::Any => "any",
            EventFilter::Only(kind) => kind.as_str(),
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        EventFilter::Only(kind)
    }
}

/// Events of one transaction's logs that pass `filter`, in log order
pub fn route_logs(filter: &EventFilter, logs: &[String]) -> Vec<PumpEvent> {
    events_from_logs(logs)
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect()
}

/// Send the routed events of `logs`; `false` once the receiver is gone
pub fn forward_logs(filter: &EventFilter, logs: &[String], tx: &mpsc::UnboundedSender<PumpEvent>) -> bool {
    for event in route_logs(filter, logs) {
        metrics::counter!(metric_names::EVENTS_TOTAL, "kind" => event.kind().as_str()).increment(1);
        if tx.send(event).is_err() {
            return false;
        }
    }
    true
}

struct ActiveSubscription {
    filter: EventFilter,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Registry of live subscriptions to one program's events
pub struct EventSubscriptions {
    ws_url: String,
    program_id: Pubkey,
    commitment: CommitmentConfig,
    next_handle: AtomicU64,
    active: DashMap<SubscriptionHandle, ActiveSubscription>,
}

impl EventSubscriptions {
    pub fn new(ws_url: impl Into<String>, program_id: Pubkey, commitment: CommitmentConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            program_id,
            commitment,
            next_handle: AtomicU64::new(1),
            active: DashMap::new(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Drop entries whose task already ended (receiver dropped or stream closed)
    fn prune_finished(&self) {
        self.active.retain(|handle, subscription| {
            let running = !subscription.task.is_finished();
            if !running {
                debug!(handle = %handle, "Subscription ended on its own");
            }
            running
        });
    }

    pub fn active_count(&self) -> usize {
        self.prune_finished();
        self.active.len()
    }

    /// `false` once the subscription was unsubscribed or its task ended
    pub fn is_active(&self, handle: SubscriptionHandle) -> bool {
        self.prune_finished();
        self.active.contains_key(&handle)
    }

    pub(crate) fn register(
        &self,
        filter: EventFilter,
        cancel: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.active.insert(handle, ActiveSubscription { filter, cancel, task });
        handle
    }

    /// Open a subscription forwarding events that pass `filter`
    #[cfg(feature = "ws-stream")]
    pub async fn subscribe(
        &self,
        filter: impl Into<EventFilter>,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<PumpEvent>), EngineError> {
        let filter = filter.into();
        let stream = websocket_stream::LogStream::new(self.ws_url.clone(), self.program_id, self.commitment);
        let client = stream.connect().await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = stream.spawn(client, filter, tx, cancel_rx).await?;
        let handle = self.register(filter, cancel_tx, task);

        info!(handle = %handle, filter = filter.label(), program = %self.program_id, "Event subscription opened");
        Ok((handle, rx))
    }

    /// Stop a subscription and close its websocket subscription
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), EngineError> {
        let (_, subscription) = self.active.remove(&handle).ok_or_else(EngineError::not_found)?;
        // Task may already have ended on its own
        let _ = subscription.cancel.send(());

        let mut task = subscription.task;
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(())) => debug!(handle = %handle, "Subscription task finished"),
            Ok(Err(e)) => warn!(handle = %handle, error = %e, "Subscription task ended abnormally"),
            Err(_) => {
                warn!(handle = %handle, "Subscription task did not stop in time, aborting");
                task.abort();
            }
        }

        info!(handle = %handle, filter = subscription.filter.label(), "Event subscription closed");
        Ok(())
    }

    /// Stop every live subscription
    pub async fn unsubscribe_all(&self) {
        let handles: Vec<SubscriptionHandle> = self.active.iter().map(|entry| *entry.key()).collect();
        for handle in handles {
            // Removed concurrently is fine
            let _ = self.unsubscribe(handle).await;
        }
    }
}

impl Drop for EventSubscriptions {
    fn drop(&mut self) {
        for entry in self.active.iter() {
            entry.value().task.abort();
        }
    }
}
