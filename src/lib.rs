// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod change_detector;
pub mod config;
pub mod cursor;
pub mod error;
pub mod events;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod scheduler;
pub mod semaphore;
pub mod summary;

use std::sync::Arc;

use anyhow::Context;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::error::{ErrorKind, PipelineError};
pub use crate::events::{EventBus, EventKind, PipelineEvent};
pub use crate::orchestrator::Orchestrator;

use crate::cursor::CursorStore;
use crate::ingest::{github::GitHubClient, SourceClient};
use crate::notify::{ChatSink, SlackNotifier};
use crate::semaphore::ConcurrencyGate;
use crate::summary::{gemini::GeminiGenerator, DynGenerator, SummaryEngine};

/// Wire bus, summary engine, gate and notifier around the given collaborators.
/// Must run inside a Tokio runtime.
pub fn assemble(
    cfg: &AppConfig,
    client: Arc<dyn SourceClient>,
    generator: DynGenerator,
    sink: Arc<dyn ChatSink>,
) -> Arc<Orchestrator> {
    let bus = EventBus::new();
    let engine = Arc::new(SummaryEngine::new(generator, cfg.prompt_options()));
    let gate = ConcurrencyGate::new(cfg.summary_concurrency);
    orchestrator::wire_pipeline(&bus, engine, gate, sink);

    Arc::new(Orchestrator::new(
        cfg.source(),
        client,
        CursorStore::new(cfg.state_file.clone()),
        bus,
    ))
}

/// Production wiring: GitHub source, Gemini enrichment, Slack delivery.
pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Arc<Orchestrator>> {
    let client = GitHubClient::new(cfg.github_token.clone()).context("github client")?;
    let generator = GeminiGenerator::new(
        cfg.gemini_api_key.clone().unwrap_or_default(),
        Some(cfg.gemini_model.as_str()),
    )
    .context("gemini client")?;
    let sink = SlackNotifier::new(cfg.slack_bot_token.clone(), cfg.slack_channel_id.clone());

    tracing::info!(
        source = %cfg.source(),
        model = %cfg.gemini_model,
        concurrency = cfg.summary_concurrency,
        slack = sink.is_enabled(),
        "pipeline configured"
    );
    Ok(assemble(
        cfg,
        Arc::new(client),
        Arc::new(generator),
        Arc::new(sink),
    ))
}
