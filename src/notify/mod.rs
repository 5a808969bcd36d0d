// src/notify/mod.rs
pub mod format;
pub mod slack;

use std::sync::Arc;

use anyhow::Result;

use crate::error::PipelineError;
use crate::events::{EventHandler, EventKind, PipelineEvent};
use format::MessageBlock;

pub use slack::SlackNotifier;

/// One chat message: ordered blocks plus a flat fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub blocks: Vec<MessageBlock>,
}

#[async_trait::async_trait]
pub trait ChatSink: Send + Sync {
    async fn send(&self, msg: &OutboundMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Renders an event into the message the operator receives.
pub fn render(event: &PipelineEvent) -> Option<OutboundMessage> {
    let msg = match event {
        PipelineEvent::SummaryCompleted { summary } => OutboundMessage {
            text: format!("📰 {}", summary.title),
            blocks: format::format_summary(summary),
        },
        PipelineEvent::SummaryFailed { url, reason } => OutboundMessage {
            text: format!("⚠️ Article summary failed: {url}"),
            blocks: format::format_failure(url, reason),
        },
        PipelineEvent::CycleCompleted {
            item_count,
            message,
        } => OutboundMessage {
            text: message.clone(),
            blocks: format::format_cycle_completed(*item_count, message),
        },
        PipelineEvent::CycleFailed { reason } => OutboundMessage {
            text: format!("Article check failed: {reason}"),
            blocks: format::format_cycle_failed(reason),
        },
        PipelineEvent::ItemDiscovered { .. } => return None,
    };
    Some(msg)
}

/// Bus subscriber that delivers every outcome event to the chat sink.
/// Delivery failures are reported to the bus as handler faults; no retry.
pub struct NotificationHandler {
    sink: Arc<dyn ChatSink>,
}

impl NotificationHandler {
    pub const KINDS: [EventKind; 4] = [
        EventKind::SummaryCompleted,
        EventKind::SummaryFailed,
        EventKind::CycleCompleted,
        EventKind::CycleFailed,
    ];

    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self { sink }
    }
}

#[async_trait::async_trait]
impl EventHandler for NotificationHandler {
    async fn handle(&self, event: &PipelineEvent) -> Result<()> {
        let Some(msg) = render(event) else {
            return Ok(());
        };
        match self.sink.send(&msg).await {
            Ok(()) => {
                metrics::counter!("digest_deliveries_total", "outcome" => "ok").increment(1);
                tracing::info!(target: "notify", sink = self.sink.name(), kind = event.kind().as_str(), "notification sent");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("digest_deliveries_total", "outcome" => "failed").increment(1);
                Err(PipelineError::delivery_failed(&e).into())
            }
        }
    }

    fn name(&self) -> &'static str {
        "notification"
    }
}
