// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::orchestrator::Orchestrator;

/// Spawn a periodic trigger for `run_cycle`. The first tick fires immediately.
/// Overlap with manual triggers is handled by the per-source lock.
pub fn spawn_cycle_scheduler(orchestrator: Arc<Orchestrator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // outcome is already published on the bus and logged by the orchestrator
            if let Err(e) = orchestrator.run_cycle().await {
                tracing::debug!(target: "scheduler", kind = %e.kind, "scheduled cycle failed");
            }
        }
    })
}
