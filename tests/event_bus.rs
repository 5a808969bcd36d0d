// tests/event_bus.rs
//
// Fault isolation on the bus: a handler that errors or panics must not stop
// later handlers or later events on the same lane.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use article_digest::events::EventHandler;
use article_digest::{EventBus, EventKind, PipelineEvent};

struct Faulty {
    panic: bool,
}

#[async_trait::async_trait]
impl EventHandler for Faulty {
    async fn handle(&self, _event: &PipelineEvent) -> anyhow::Result<()> {
        if self.panic {
            panic!("handler blew up");
        }
        anyhow::bail!("handler failed")
    }
    fn name(&self) -> &'static str {
        "faulty"
    }
}

struct Collect(Arc<Mutex<Vec<String>>>);

#[async_trait::async_trait]
impl EventHandler for Collect {
    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        if let PipelineEvent::CycleFailed { reason } = event {
            self.0.lock().push(reason.clone());
        }
        Ok(())
    }
    fn name(&self) -> &'static str {
        "collect"
    }
}

fn failed(reason: &str) -> PipelineEvent {
    PipelineEvent::CycleFailed {
        reason: reason.into(),
    }
}

#[tokio::test]
async fn erroring_handler_does_not_stop_siblings() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(EventKind::CycleFailed, Arc::new(Faulty { panic: false }));
    bus.subscribe(EventKind::CycleFailed, Arc::new(Collect(seen.clone())));

    bus.publish(failed("one"));
    bus.publish(failed("two"));
    bus.wait_idle().await;

    assert_eq!(*seen.lock(), vec!["one", "two"]);
}

#[tokio::test]
async fn panicking_handler_is_contained() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(EventKind::CycleFailed, Arc::new(Faulty { panic: true }));
    bus.subscribe(EventKind::CycleFailed, Arc::new(Collect(seen.clone())));

    bus.publish(failed("after panic"));
    tokio::time::timeout(Duration::from_secs(5), bus.wait_idle())
        .await
        .expect("bus drains");

    assert_eq!(*seen.lock(), vec!["after panic"]);
    assert_eq!(bus.in_flight(), 0);
}

#[tokio::test]
async fn other_kinds_are_not_delivered() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe(EventKind::CycleFailed, Arc::new(Collect(seen.clone())));

    bus.publish(PipelineEvent::CycleCompleted {
        item_count: 0,
        message: "quiet".into(),
    });
    bus.wait_idle().await;

    assert!(seen.lock().is_empty());
}
