// src/events.rs
//! In-process publish/subscribe bus connecting discovery, summarization and
//! notification.
//!
//! Each event kind has its own dispatch lane (an unbounded channel drained by one
//! task). `publish` only enqueues, so it never runs handler code on the caller's
//! stack. A lane hands every event to the kind's handlers one at a time in
//! registration order, so handlers of one kind observe events in publish order.
//! Handler errors and panics are logged as faults and do not stop the lane.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use crate::summary::ArticleSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    ItemDiscovered,
    SummaryCompleted,
    SummaryFailed,
    CycleCompleted,
    CycleFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::ItemDiscovered,
        EventKind::SummaryCompleted,
        EventKind::SummaryFailed,
        EventKind::CycleCompleted,
        EventKind::CycleFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ItemDiscovered => "item.discovered",
            EventKind::SummaryCompleted => "summary.completed",
            EventKind::SummaryFailed => "summary.failed",
            EventKind::CycleCompleted => "cycle.completed",
            EventKind::CycleFailed => "cycle.failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    ItemDiscovered { title: String, url: String },
    SummaryCompleted { summary: ArticleSummary },
    SummaryFailed { url: String, reason: String },
    CycleCompleted { item_count: usize, message: String },
    CycleFailed { reason: String },
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::ItemDiscovered { .. } => EventKind::ItemDiscovered,
            PipelineEvent::SummaryCompleted { .. } => EventKind::SummaryCompleted,
            PipelineEvent::SummaryFailed { .. } => EventKind::SummaryFailed,
            PipelineEvent::CycleCompleted { .. } => EventKind::CycleCompleted,
            PipelineEvent::CycleFailed { .. } => EventKind::CycleFailed,
        }
    }
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()>;
    fn name(&self) -> &'static str;
}

type Handlers = Vec<Arc<dyn EventHandler>>;

struct Inner {
    handlers: RwLock<HashMap<EventKind, Handlers>>,
    lanes: HashMap<EventKind, mpsc::UnboundedSender<Arc<PipelineEvent>>>,
    pending: AtomicUsize,
    idle: Notify,
}

impl Inner {
    fn handlers_for(&self, kind: EventKind) -> Handlers {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Decrements the in-flight count even if the tracked work panics.
struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

/// Cheap to clone; all clones share the same lanes and handlers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Must be called inside a Tokio runtime: spawns one lane task per kind.
    pub fn new() -> Self {
        let mut lanes = HashMap::new();
        let mut receivers = Vec::new();
        for kind in EventKind::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            lanes.insert(kind, tx);
            receivers.push((kind, rx));
        }

        let inner = Arc::new(Inner {
            handlers: RwLock::new(HashMap::new()),
            lanes,
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        for (kind, rx) in receivers {
            tokio::spawn(run_lane(kind, rx, Arc::downgrade(&inner)));
        }

        Self { inner }
    }

    /// Registers `handler` for the lifetime of the bus.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        tracing::debug!(target: "events", kind = kind.as_str(), handler = handler.name(), "subscribed");
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Fire-and-forget: enqueues and returns.
    pub fn publish(&self, event: PipelineEvent) {
        let kind = event.kind();
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let Some(lane) = self.inner.lanes.get(&kind) else {
            self.inner.finish_one();
            return;
        };
        if lane.send(Arc::new(event)).is_err() {
            tracing::warn!(target: "events", kind = kind.as_str(), "lane closed, event dropped");
            self.inner.finish_one();
            return;
        }
        tracing::debug!(target: "events", kind = kind.as_str(), "published");
    }

    /// Runs `work` as an independent task counted as in-flight bus work.
    /// Handlers use this to fan out without blocking their lane.
    pub fn spawn_tracked<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            work.await;
        });
    }

    /// Events and tracked tasks not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Resolves once nothing is in flight. Used for draining on shutdown and in tests.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_lane(
    kind: EventKind,
    mut rx: mpsc::UnboundedReceiver<Arc<PipelineEvent>>,
    bus: Weak<Inner>,
) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = bus.upgrade() else { break };
        let guard = PendingGuard(inner);
        for handler in guard.0.handlers_for(kind) {
            dispatch(kind, handler, Arc::clone(&event)).await;
        }
    }
    tracing::debug!(target: "events", kind = kind.as_str(), "lane stopped");
}

async fn dispatch(kind: EventKind, handler: Arc<dyn EventHandler>, event: Arc<PipelineEvent>) {
    let name = handler.name();
    let outcome = tokio::spawn(async move { handler.handle(&event).await }).await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            metrics::counter!("digest_handler_faults_total").increment(1);
            tracing::warn!(target: "events", kind = kind.as_str(), handler = name, error = %format!("{e:#}"), "handler fault");
        }
        Err(join) => {
            metrics::counter!("digest_handler_faults_total").increment(1);
            tracing::error!(target: "events", kind = kind.as_str(), handler = name, error = %join, "handler panicked");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
