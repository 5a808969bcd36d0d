// src/orchestrator.rs
//! Fetch-cycle driver and pipeline wiring.
//!
//! One cycle: lock the source, load cursor state, detect new items, persist the
//! advanced cursor, then publish one `ItemDiscovered` per item followed by a
//! single cycle outcome event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;

use crate::change_detector::ChangeDetector;
use crate::cursor::{CursorStore, SourceIdentity};
use crate::error::PipelineError;
use crate::events::{EventBus, EventHandler, EventKind, PipelineEvent};
use crate::ingest::SourceClient;
use crate::notify::{ChatSink, NotificationHandler};
use crate::semaphore::ConcurrencyGate;
use crate::summary::SummaryEngine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub source: String,
    pub item_count: usize,
    pub new_revision: String,
    pub total_processed: u64,
}

impl CycleReport {
    pub fn message(&self) -> String {
        match self.item_count {
            0 => format!("No new articles in {}.", self.source),
            1 => format!("Found 1 new article in {}.", self.source),
            n => format!("Found {n} new articles in {}.", self.source),
        }
    }
}

pub struct Orchestrator {
    source: SourceIdentity,
    client: Arc<dyn SourceClient>,
    store: CursorStore,
    bus: EventBus,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        source: SourceIdentity,
        client: Arc<dyn SourceClient>,
        store: CursorStore,
        bus: EventBus,
    ) -> Self {
        Self {
            source,
            client,
            store,
            bus,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &SourceIdentity {
        &self.source
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn lock_for(&self, source: &SourceIdentity) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(source.key()).or_default())
    }

    /// Runs one cycle for the configured source.
    pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        let source = self.source.clone();
        self.run_cycle_for(&source).await
    }

    /// Re-entrant: overlapping calls for one source are serialized.
    pub async fn run_cycle_for(&self, source: &SourceIdentity) -> Result<CycleReport, PipelineError> {
        tracing::info!(target: "cycle", %source, "cycle started");
        match self.cycle(source).await {
            Ok(report) => {
                metrics::counter!("digest_cycles_total", "outcome" => "ok").increment(1);
                metrics::gauge!("digest_last_cycle_ts").set(Utc::now().timestamp() as f64);
                tracing::info!(target: "cycle", %source, items = report.item_count, revision = %report.new_revision, "cycle completed");
                self.bus.publish(PipelineEvent::CycleCompleted {
                    item_count: report.item_count,
                    message: report.message(),
                });
                Ok(report)
            }
            Err(e) => {
                metrics::counter!("digest_cycles_total", "outcome" => e.kind.as_str()).increment(1);
                tracing::warn!(target: "cycle", %source, kind = %e.kind, error = %e.message, "cycle failed");
                self.bus.publish(PipelineEvent::CycleFailed {
                    reason: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn cycle(&self, source: &SourceIdentity) -> Result<CycleReport, PipelineError> {
        let lock = self.lock_for(source);
        let _held = lock.lock().await;

        let mut doc = self.store.load().await?.unwrap_or_default();
        let detection = ChangeDetector::new(self.client.as_ref())
            .detect(source, &doc)
            .await?;

        let state = doc
            .record_cycle(
                source,
                detection.new_revision.clone(),
                Utc::now(),
                detection.items.len(),
            )
            .clone();
        self.store
            .save(&doc)
            .await
            .map_err(|e| PipelineError::state_corrupt(format!("{e:#}")))?;

        metrics::counter!("digest_items_discovered_total").increment(detection.items.len() as u64);
        let report = CycleReport {
            source: source.key(),
            item_count: detection.items.len(),
            new_revision: detection.new_revision,
            total_processed: state.total_articles_processed,
        };
        for item in detection.items {
            self.bus.publish(PipelineEvent::ItemDiscovered {
                title: item.title,
                url: item.url,
            });
        }
        Ok(report)
    }

    /// Manual request: feeds one URL through the same pipeline.
    pub fn summarize_one(&self, url: &str) {
        tracing::info!(target: "cycle", url, "manual summary requested");
        self.bus.publish(PipelineEvent::ItemDiscovered {
            title: url.to_string(),
            url: url.to_string(),
        });
    }
}

/// `ItemDiscovered` subscriber. Takes a gate permit in lane order, then runs
/// the enrichment as tracked bus work so sibling items proceed independently.
pub struct SummarizeHandler {
    engine: Arc<SummaryEngine>,
    gate: ConcurrencyGate,
    bus: EventBus,
}

impl SummarizeHandler {
    pub fn new(engine: Arc<SummaryEngine>, gate: ConcurrencyGate, bus: EventBus) -> Self {
        Self { engine, gate, bus }
    }
}

#[async_trait::async_trait]
impl EventHandler for SummarizeHandler {
    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        let PipelineEvent::ItemDiscovered { title, url } = event else {
            return Ok(());
        };
        let permit = self.gate.acquire().await.context("summary gate closed")?;
        tracing::debug!(target: "summary", %title, %url, available = self.gate.available_permits(), "permit acquired");

        let engine = Arc::clone(&self.engine);
        let bus = self.bus.clone();
        let url = url.clone();
        self.bus.spawn_tracked(async move {
            let _permit = permit;
            let next = match engine.summarize(&url).await {
                Ok(summary) => {
                    metrics::counter!("digest_summaries_total", "outcome" => "ok").increment(1);
                    PipelineEvent::SummaryCompleted { summary }
                }
                Err(e) => {
                    metrics::counter!("digest_summaries_total", "outcome" => e.kind.as_str()).increment(1);
                    PipelineEvent::SummaryFailed {
                        url,
                        reason: e.user_message(),
                    }
                }
            };
            bus.publish(next);
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "summarize"
    }
}

/// Registers the summarize and notification subscribers on `bus`.
pub fn wire_pipeline(
    bus: &EventBus,
    engine: Arc<SummaryEngine>,
    gate: ConcurrencyGate,
    sink: Arc<dyn ChatSink>,
) {
    bus.subscribe(
        EventKind::ItemDiscovered,
        Arc::new(SummarizeHandler::new(engine, gate, bus.clone())),
    );
    let notifier: Arc<dyn EventHandler> = Arc::new(NotificationHandler::new(sink));
    for kind in NotificationHandler::KINDS {
        bus.subscribe(kind, Arc::clone(&notifier));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_message_pluralizes() {
        let mut r = CycleReport {
            source: "o/r".into(),
            item_count: 0,
            new_revision: "h".into(),
            total_processed: 0,
        };
        assert_eq!(r.message(), "No new articles in o/r.");
        r.item_count = 1;
        assert_eq!(r.message(), "Found 1 new article in o/r.");
        r.item_count = 3;
        assert_eq!(r.message(), "Found 3 new articles in o/r.");
    }
}
