// src/api.rs
//! HTTP surface: health, Slack slash commands and a synchronous check endpoint.
//! Slash commands must be answered within Slack's 3s budget, so they only
//! acknowledge and leave the work to background tasks.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::orchestrator::{CycleReport, Orchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/webhook/slack/check-articles", post(slack_check_articles))
        .route("/webhook/slack/summarize-article", post(slack_summarize_article))
        .route("/fetcher/check", get(fetcher_check))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Subset of the slash-command form body we use.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlackCommand {
    pub user_id: String,
    pub user_name: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackCommandResponse {
    pub response_type: ResponseType,
    pub text: String,
}

impl SlackCommandResponse {
    fn in_channel(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::InChannel,
            text: text.into(),
        }
    }

    fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: text.into(),
        }
    }
}

async fn slack_check_articles(
    State(state): State<AppState>,
    Form(cmd): Form<SlackCommand>,
) -> Json<SlackCommandResponse> {
    tracing::info!(target: "api", user = %cmd.user_name, "slash command: check-articles");

    let orchestrator = Arc::clone(&state.orchestrator);
    state.orchestrator.bus().spawn_tracked(async move {
        // failures are already published as CycleFailed and logged
        let _ = orchestrator.run_cycle().await;
    });

    Json(SlackCommandResponse::in_channel(
        "🔍 Checking for newly added articles...",
    ))
}

/// Accepts only absolute http(s) URLs.
pub fn validate_article_url(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(
            "❌ Please provide a URL.\nUsage: `/summarize-article https://example.com/article`"
                .to_string(),
        );
    }
    match reqwest::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(u.to_string()),
        _ => Err(format!("❌ Not a valid URL: {raw}")),
    }
}

async fn slack_summarize_article(
    State(state): State<AppState>,
    Form(cmd): Form<SlackCommand>,
) -> Json<SlackCommandResponse> {
    tracing::info!(target: "api", user = %cmd.user_name, "slash command: summarize-article");

    let url = match validate_article_url(cmd.text.as_deref().unwrap_or_default()) {
        Ok(u) => u,
        Err(msg) => return Json(SlackCommandResponse::ephemeral(msg)),
    };
    state.orchestrator.summarize_one(&url);

    Json(SlackCommandResponse::in_channel(format!(
        "🔍 Analyzing the article... {url}"
    )))
}

#[derive(Serialize)]
struct CheckOut {
    success: bool,
    #[serde(flatten)]
    report: CycleReport,
}

#[derive(Serialize)]
struct ErrorOut {
    success: bool,
    kind: String,
    error: String,
}

/// Runs a cycle and waits for its detection result (summaries still run in background).
async fn fetcher_check(
    State(state): State<AppState>,
) -> Result<Json<CheckOut>, (StatusCode, Json<ErrorOut>)> {
    match state.orchestrator.run_cycle().await {
        Ok(report) => Ok(Json(CheckOut {
            success: true,
            report,
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorOut {
                success: false,
                kind: e.kind.to_string(),
                error: e.message,
            }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(validate_article_url("").is_err());
        assert!(validate_article_url("   ").is_err());
        assert!(validate_article_url("not a url").is_err());
        assert!(validate_article_url("ftp://x.dev/a").is_err());
        assert_eq!(
            validate_article_url(" https://x.dev/a ").unwrap(),
            "https://x.dev/a"
        );
    }

    #[test]
    fn response_type_serializes_snake_case() {
        let v = serde_json::to_value(SlackCommandResponse::in_channel("hi")).unwrap();
        assert_eq!(v["response_type"], "in_channel");
    }
}
