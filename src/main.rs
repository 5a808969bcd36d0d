//! Article digest service binary.
//! Boots the Axum HTTP server, the fetch-cycle scheduler and the event pipeline.

use std::time::Duration;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use article_digest::api::{self, AppState};
use article_digest::metrics::Metrics;
use article_digest::scheduler::spawn_cycle_scheduler;
use article_digest::AppConfig;

/// Compact logs by default, JSON when LOG_FORMAT=json. Filter via RUST_LOG.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("article_digest=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // The runtime may already have installed a subscriber; keep theirs then.
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("load configuration")?;
    let orchestrator = article_digest::from_config(&cfg)?;
    let metrics = Metrics::init()?;

    if cfg.check_interval_secs > 0 {
        tracing::info!(every_secs = cfg.check_interval_secs, "scheduler enabled");
        spawn_cycle_scheduler(
            orchestrator.clone(),
            Duration::from_secs(cfg.check_interval_secs),
        );
    }

    let router = api::router(AppState { orchestrator }).merge(metrics.router());
    Ok(router.into())
}
