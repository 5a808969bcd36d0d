//! Demo that pushes a sample summary and a failure through the Slack notifier
//! (block JSON is printed when Slack credentials are not configured).

use article_digest::notify::{format, render, slack, ChatSink, SlackNotifier};
use article_digest::summary::ArticleSummary;
use article_digest::PipelineEvent;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let notifier = SlackNotifier::new(
        std::env::var("SLACK_BOT_TOKEN").ok(),
        std::env::var("SLACK_CHANNEL_ID").ok(),
    );

    let seq = [
        PipelineEvent::SummaryCompleted {
            summary: ArticleSummary {
                url: "https://www.swift.org/blog/nightly-swift-sdk-for-android/".into(),
                title: "Swift SDK for Android".into(),
                summary_line: "Nightly Swift SDK builds now target Android.".into(),
                bullets: vec![
                    "Cross-compile Swift packages for Android".into(),
                    "Uses the **Android NDK** toolchain".into(),
                    "See `swift sdk install` for setup".into(),
                ],
            },
        },
        PipelineEvent::SummaryFailed {
            url: "https://example.com/missing".into(),
            reason: "The article could not be opened or read.".into(),
        },
    ];

    for ev in seq {
        let Some(msg) = render(&ev) else { continue };
        if notifier.is_enabled() {
            if let Err(e) = notifier.send(&msg).await {
                tracing::warn!("demo send failed: {e:#}");
            }
        } else {
            let payload = slack::payload("demo-channel", &msg);
            println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        }
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    }

    println!(
        "notify-demo done (section limit {} chars)",
        format::MAX_SECTION_LEN
    );
}
