// tests/change_detector.rs
//
// Detection against a scripted repository host: first-run window, unchanged
// head, normal diff, and transport failures.

mod common;

use chrono::Utc;

use article_digest::change_detector::{ChangeDetector, FIRST_RUN_WINDOW};
use article_digest::cursor::{CursorDocument, SourceIdentity};
use article_digest::ErrorKind;
use common::ScriptedSource;

fn source() -> SourceIdentity {
    SourceIdentity::new("acme", "swift-news", "main")
}

const DIFF: &str = "\
+++ b/README.md
@@ -1,3 +1,6 @@
 - [Old](https://old.dev/post)
+- [Swift SDK for Android](https://www.swift.org/blog/nightly-swift-sdk-for-android/)
+- [WWDC talk](https://www.youtube.com/watch?v=abc)
+- [Concurrency notes](https://blog.dev/concurrency)
-- [Removed](https://gone.dev/x)
";

#[tokio::test]
async fn first_run_with_single_revision_reports_nothing() {
    let client = ScriptedSource::new("h1", &["h1"], DIFF);
    let doc = CursorDocument::default();

    let det = ChangeDetector::new(client.as_ref())
        .detect(&source(), &doc)
        .await
        .expect("detect");

    assert!(det.items.is_empty());
    assert_eq!(det.new_revision, "h1");
    assert!(client.calls.lock().diff.is_empty());
}

#[tokio::test]
async fn first_run_diffs_from_oldest_revision_in_window() {
    let client = ScriptedSource::new("h2", &["h2", "h1", "h0"], DIFF);
    let doc = CursorDocument::default();

    let det = ChangeDetector::new(client.as_ref())
        .detect(&source(), &doc)
        .await
        .expect("detect");

    let calls = client.calls.lock();
    assert_eq!(calls.diff.len(), 1);
    // window of FIRST_RUN_WINDOW revisions, most-recent-first
    assert_eq!(FIRST_RUN_WINDOW, 2);
    assert_eq!(calls.diff[0], ("h1".to_string(), "h2".to_string()));
    assert_eq!(det.new_revision, "h2");
    let urls: Vec<_> = det.items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.swift.org/blog/nightly-swift-sdk-for-android/",
            "https://blog.dev/concurrency",
        ]
    );
}

#[tokio::test]
async fn unchanged_head_skips_diff() {
    let client = ScriptedSource::new("h5", &["h5", "h4"], DIFF);
    let mut doc = CursorDocument::default();
    doc.record_cycle(&source(), "h5".into(), Utc::now(), 0);

    let det = ChangeDetector::new(client.as_ref())
        .detect(&source(), &doc)
        .await
        .expect("detect");

    assert!(det.items.is_empty());
    assert_eq!(det.new_revision, "h5");
    let calls = client.calls.lock();
    assert_eq!(calls.head, 1);
    assert_eq!(calls.recent, 0);
    assert!(calls.diff.is_empty());
}

#[tokio::test]
async fn stored_revision_is_used_as_diff_base() {
    let client = ScriptedSource::new("h9", &["h9", "h8"], DIFF);
    let mut doc = CursorDocument::default();
    doc.record_cycle(&source(), "h3".into(), Utc::now(), 0);

    let det = ChangeDetector::new(client.as_ref())
        .detect(&source(), &doc)
        .await
        .expect("detect");

    assert_eq!(det.items.len(), 2);
    assert_eq!(client.calls.lock().diff[0], ("h3".to_string(), "h9".to_string()));
}

#[tokio::test]
async fn transport_failure_is_source_unreachable() {
    let client = ScriptedSource::new("h1", &["h1", "h0"], DIFF);
    client.go_offline();

    let err = ChangeDetector::new(client.as_ref())
        .detect(&source(), &CursorDocument::default())
        .await
        .expect_err("offline host must fail");

    assert_eq!(err.kind, ErrorKind::SourceUnreachable);
    assert!(err.kind.is_cycle_level());
}
