// src/summary/mod.rs
//! Summary engine: one generation call per article URL, parsed into a
//! structured summary or a typed failure.

pub mod gemini;
pub mod parse;
pub mod prompt;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ErrorKind, PipelineError};
use prompt::PromptOptions;

/// Structured result of one enrichment. `title` and `summary_line` are
/// non-empty and `bullets` holds 1..=5 entries without list markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    pub summary_line: String,
    pub bullets: Vec<String>,
}

impl ArticleSummary {
    /// Markdown body handed to the notification formatter.
    pub fn to_markdown(&self) -> String {
        let bullets = self
            .bullets
            .iter()
            .map(|b| format!("- {b}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "## Overview\n{}\n\n## Key Points\n{}",
            self.summary_line, bullets
        )
    }
}

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

/// Single prompt in, single text response out. No streaming.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn Generator>;

/// Returns a fixed response (or error) and records prompts; for tests and local runs.
#[derive(Default)]
pub struct MockGenerator {
    response: Option<String>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn replying(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as a transport error.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl Generator for MockGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        if let Ok(mut g) = self.prompts.lock() {
            g.push(prompt.to_string());
        }
        let out = self.response.clone();
        Box::pin(async move { out.ok_or_else(|| anyhow::anyhow!("mock generator is offline")) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub struct SummaryEngine {
    generator: DynGenerator,
    prompt: PromptOptions,
}

impl SummaryEngine {
    pub fn new(generator: DynGenerator, prompt: PromptOptions) -> Self {
        Self { generator, prompt }
    }

    pub async fn summarize(&self, url: &str) -> Result<ArticleSummary, PipelineError> {
        let prompt = prompt::build_prompt(url, &self.prompt);
        tracing::info!(target: "summary", url, provider = self.generator.name(), "summarizing");

        let response = self.generator.generate(&prompt).await.map_err(|e| {
            tracing::warn!(target: "summary", url, error = %format!("{e:#}"), "generation call failed");
            PipelineError::for_url(ErrorKind::SummaryFailed, url, format!("generation call failed: {e:#}"))
        })?;

        let parsed = parse::parse_response(url, &response);
        if let Err(e) = &parsed {
            tracing::warn!(target: "summary", url, kind = %e.kind, "response rejected");
        }
        parsed
    }
}
