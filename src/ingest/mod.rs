// src/ingest/mod.rs
pub mod github;

use anyhow::Result;

use crate::cursor::SourceIdentity;

/// Narrow contract over the repository host. Implementations own transport
/// and retry behavior; callers only see `anyhow` errors.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    /// Current head revision of `source.branch`.
    async fn head_revision(&self, source: &SourceIdentity) -> Result<String>;

    /// Most recent `count` revisions on the branch, most-recent-first.
    async fn recent_revisions(&self, source: &SourceIdentity, count: usize) -> Result<Vec<String>>;

    /// Unified diff text between two revisions.
    async fn diff(&self, source: &SourceIdentity, base: &str, head: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}
