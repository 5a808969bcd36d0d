use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_cycles_total", "Fetch cycles by outcome.");
        describe_counter!(
            "digest_items_discovered_total",
            "Article links discovered in source diffs."
        );
        describe_counter!("digest_summaries_total", "Summaries by outcome.");
        describe_counter!("digest_deliveries_total", "Chat deliveries by outcome.");
        describe_counter!(
            "digest_handler_faults_total",
            "Event handler errors and panics caught by the bus."
        );
        describe_gauge!(
            "digest_last_cycle_ts",
            "Unix ts of the last successful fetch cycle."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
