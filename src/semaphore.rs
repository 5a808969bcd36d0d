// src/semaphore.rs
//! Counting gate that bounds concurrent enrichment calls.
//!
//! Backed by `tokio::sync::Semaphore`, which queues waiters FIFO and hands a
//! released permit straight to the oldest waiter.

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    inner: Arc<Semaphore>,
    capacity: usize,
}

/// Held while the gated work runs; dropping it releases the permit.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// A capacity of 0 is raised to 1 so the gate can never deadlock.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits (FIFO) until a permit is free.
    pub async fn acquire(&self) -> Result<GatePermit, AcquireError> {
        let permit = Arc::clone(&self.inner).acquire_owned().await?;
        Ok(GatePermit { _permit: permit })
    }

    /// Non-waiting variant; `None` when every permit is in use.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.inner)
            .try_acquire_owned()
            .ok()
            .map(|p| GatePermit { _permit: p })
    }

    /// Informational only.
    pub fn available_permits(&self) -> usize {
        self.inner.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
