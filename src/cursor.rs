// src/cursor.rs
//! Durable per-source cursor state, persisted as one JSON document.

use std::collections::BTreeMap;
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::PipelineError;

pub const DEFAULT_STATE_PATH: &str = "data/fetcher-state.json";

/// One trackable upstream repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl SourceIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: branch.into(),
        }
    }

    /// Key under which the state is stored: `owner/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceState {
    pub owner: String,
    pub repo: String,
    pub last_processed_revision: String,
    pub last_checked_at: DateTime<Utc>,
    pub total_articles_processed: u64,
}

impl SourceState {
    pub fn first(source: &SourceIdentity, revision: String, now: DateTime<Utc>) -> Self {
        Self {
            owner: source.owner.clone(),
            repo: source.name.clone(),
            last_processed_revision: revision,
            last_checked_at: now,
            total_articles_processed: 0,
        }
    }

    /// Advance the cursor after a cycle, zero new items included.
    pub fn advance(&mut self, revision: String, now: DateTime<Utc>, new_items: usize) {
        self.last_processed_revision = revision;
        self.last_checked_at = now;
        self.total_articles_processed = self
            .total_articles_processed
            .saturating_add(new_items as u64);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorDocument {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceState>,
}

impl CursorDocument {
    pub fn get(&self, source: &SourceIdentity) -> Option<&SourceState> {
        self.sources.get(&source.key())
    }

    /// Insert or advance the entry for `source`.
    pub fn record_cycle(
        &mut self,
        source: &SourceIdentity,
        revision: String,
        now: DateTime<Utc>,
        new_items: usize,
    ) -> &SourceState {
        let entry = self
            .sources
            .entry(source.key())
            .or_insert_with(|| SourceState::first(source, revision.clone(), now));
        entry.advance(revision, now, new_items);
        entry
    }
}

/// File-backed store. Every `save` replaces the whole document.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet (first run).
    pub async fn load(&self) -> Result<Option<CursorDocument>, PipelineError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no cursor state yet, first run");
                return Ok(None);
            }
            Err(e) => {
                return Err(PipelineError::state_corrupt(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let doc: CursorDocument = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::state_corrupt(format!("parse {}: {e}", self.path.display()))
        })?;
        tracing::debug!(sources = doc.sources.len(), "cursor state loaded");
        Ok(Some(doc))
    }

    /// Write to a sibling temp file, then rename over the target.
    pub async fn save(&self, doc: &CursorDocument) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create state dir {}", dir.display()))?;
        }

        let json = serde_json::to_vec_pretty(doc).context("serialize cursor state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename into {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "cursor state saved");
        Ok(())
    }
}
