// tests/common/mod.rs
//
// Shared fakes for integration tests: a scripted repository host, a generator
// that answers per URL and a chat sink that records deliveries.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use article_digest::cursor::SourceIdentity;
use article_digest::ingest::SourceClient;
use article_digest::notify::{ChatSink, OutboundMessage};
use article_digest::summary::{GenerateFuture, Generator};

#[derive(Default)]
pub struct Calls {
    pub head: usize,
    pub recent: usize,
    pub diff: Vec<(String, String)>,
}

/// Repository host whose head, history and diff text are set by the test.
#[derive(Default)]
pub struct ScriptedSource {
    pub head: Mutex<String>,
    pub recent: Mutex<Vec<String>>,
    pub diff_text: Mutex<String>,
    pub offline: Mutex<bool>,
    pub calls: Mutex<Calls>,
}

impl ScriptedSource {
    pub fn new(head: &str, recent: &[&str], diff: &str) -> Arc<Self> {
        Arc::new(Self {
            head: Mutex::new(head.to_string()),
            recent: Mutex::new(recent.iter().map(|s| s.to_string()).collect()),
            diff_text: Mutex::new(diff.to_string()),
            ..Default::default()
        })
    }

    pub fn set_head(&self, head: &str, diff: &str) {
        *self.head.lock() = head.to_string();
        *self.diff_text.lock() = diff.to_string();
    }

    pub fn go_offline(&self) {
        *self.offline.lock() = true;
    }

    fn check_online(&self) -> Result<()> {
        if *self.offline.lock() {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SourceClient for ScriptedSource {
    async fn head_revision(&self, _source: &SourceIdentity) -> Result<String> {
        self.calls.lock().head += 1;
        self.check_online()?;
        Ok(self.head.lock().clone())
    }

    async fn recent_revisions(&self, _source: &SourceIdentity, count: usize) -> Result<Vec<String>> {
        self.calls.lock().recent += 1;
        self.check_online()?;
        Ok(self.recent.lock().iter().take(count).cloned().collect())
    }

    async fn diff(&self, _source: &SourceIdentity, base: &str, head: &str) -> Result<String> {
        self.calls.lock().diff.push((base.to_string(), head.to_string()));
        self.check_online()?;
        Ok(self.diff_text.lock().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Well-formed enrichment response for `title`.
pub fn response_for(title: &str) -> String {
    format!(
        "## Title\n{title}\n\n## Summary\nWhat {title} is about.\n\n## Key Points\n- first point\n- second point\n"
    )
}

/// Answers by matching the URL embedded in the prompt; unknown URLs fail.
#[derive(Default)]
pub struct UrlGenerator {
    pub replies: HashMap<String, String>,
}

impl UrlGenerator {
    pub fn with(mut self, url: &str, reply: impl Into<String>) -> Self {
        self.replies.insert(url.to_string(), reply.into());
        self
    }
}

impl Generator for UrlGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        let hit = self
            .replies
            .iter()
            .find(|(url, _)| prompt.contains(url.as_str()))
            .map(|(_, r)| r.clone());
        Box::pin(async move { hit.ok_or_else(|| anyhow!("upstream returned 503")) })
    }

    fn name(&self) -> &'static str {
        "url-fake"
    }
}

/// Records every delivered message; can be switched to fail.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub fail: Mutex<bool>,
}

impl RecordingSink {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait::async_trait]
impl ChatSink for RecordingSink {
    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        if *self.fail.lock() {
            return Err(anyhow!("channel_not_found"));
        }
        self.sent.lock().push(msg.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
