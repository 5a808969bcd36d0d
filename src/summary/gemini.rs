// src/summary/gemini.rs
//! Google Gemini `generateContent` provider with the URL-context tool enabled,
//! so the model can open the article itself.

use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use super::{GenerateFuture, Generator};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY is not set");
        }
        let http = reqwest::Client::builder()
            .user_agent("article-digest/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Tool {
    url_context: serde_json::Value,
}

#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
    tools: Vec<Tool>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}

#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Deserialize)]
struct RespPart {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenated text parts of the first candidate; empty when there are none.
fn response_text(resp: Resp) -> String {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

impl Generator for GeminiGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            let req = Req {
                contents: vec![Content {
                    role: "user",
                    parts: vec![Part { text: prompt }],
                }],
                tools: vec![Tool {
                    url_context: serde_json::json!({}),
                }],
            };

            let resp: Resp = self
                .http
                .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
                .header("x-goog-api-key", &self.api_key)
                .json(&req)
                .send()
                .await
                .context("gemini request")?
                .error_for_status()
                .context("gemini non-2xx")?
                .json()
                .await
                .context("parse gemini response")?;

            Ok(response_text(resp))
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected() {
        assert!(GeminiGenerator::new("  ", None).is_err());
    }

    #[test]
    fn text_parts_are_joined() {
        let raw = r###"{"candidates":[{"content":{"parts":[{"text":"## Title\n"},{"text":"T"}]}}]}"###;
        let resp: Resp = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(resp), "## Title\nT");
    }

    #[test]
    fn no_candidates_is_empty_text() {
        let resp: Resp = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(response_text(resp), "");
        let resp: Resp = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(response_text(resp), "");
    }
}
