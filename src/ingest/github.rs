// src/ingest/github.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;

use super::SourceClient;
use crate::cursor::SourceIdentity;

const API_BASE: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_DIFF: &str = "application/vnd.github.diff";

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

/// GitHub REST v3 client for commits and compare endpoints.
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("article-digest/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("build github http client")?;
        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Point at a different API root (GitHub Enterprise, local fakes).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, path: &str, accept: &'static str) -> reqwest::RequestBuilder {
        let req = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, accept);
        match &self.token {
            Some(t) => req.header(header::AUTHORIZATION, format!("token {t}")),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl SourceClient for GitHubClient {
    async fn head_revision(&self, source: &SourceIdentity) -> Result<String> {
        let path = format!(
            "/repos/{}/{}/commits/{}",
            source.owner, source.name, source.branch
        );
        tracing::debug!(target: "ingest", %path, "fetching head revision");

        let commit: CommitRef = self
            .get(&path, ACCEPT_JSON)
            .send()
            .await
            .context("github head request")?
            .error_for_status()
            .context("github head non-2xx")?
            .json()
            .await
            .context("parse github commit")?;
        Ok(commit.sha)
    }

    async fn recent_revisions(&self, source: &SourceIdentity, count: usize) -> Result<Vec<String>> {
        let path = format!(
            "/repos/{}/{}/commits?sha={}&per_page={}",
            source.owner, source.name, source.branch, count
        );
        tracing::debug!(target: "ingest", %path, "fetching recent revisions");

        let commits: Vec<CommitRef> = self
            .get(&path, ACCEPT_JSON)
            .send()
            .await
            .context("github commits request")?
            .error_for_status()
            .context("github commits non-2xx")?
            .json()
            .await
            .context("parse github commit list")?;
        Ok(commits.into_iter().map(|c| c.sha).collect())
    }

    async fn diff(&self, source: &SourceIdentity, base: &str, head: &str) -> Result<String> {
        let path = format!(
            "/repos/{}/{}/compare/{}...{}",
            source.owner, source.name, base, head
        );
        tracing::debug!(target: "ingest", base, head, "fetching diff");

        self.get(&path, ACCEPT_DIFF)
            .send()
            .await
            .context("github compare request")?
            .error_for_status()
            .context("github compare non-2xx")?
            .text()
            .await
            .context("read github diff body")
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
