// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::cursor::{SourceIdentity, DEFAULT_STATE_PATH};
use crate::summary::gemini::DEFAULT_MODEL;
use crate::summary::prompt::PromptOptions;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const DEFAULT_CONCURRENCY: usize = 3;

fn default_owner() -> String {
    "SAllen0400".to_string()
}
fn default_repo() -> String {
    "swift-news".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_owner: String,
    pub source_repo: String,
    pub source_branch: String,
    pub state_file: PathBuf,
    pub github_token: Option<String>,
    /// Normally supplied via env (`GEMINI_API_KEY`), never committed in the file.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub summary_topic: String,
    pub summary_language: String,
    pub summary_concurrency: usize,
    pub slack_bot_token: Option<String>,
    pub slack_channel_id: Option<String>,
    /// 0 disables the periodic scheduler.
    pub check_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let prompt = PromptOptions::default();
        Self {
            source_owner: default_owner(),
            source_repo: default_repo(),
            source_branch: default_branch(),
            state_file: PathBuf::from(DEFAULT_STATE_PATH),
            github_token: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            summary_topic: prompt.topic,
            summary_language: prompt.language,
            summary_concurrency: DEFAULT_CONCURRENCY,
            slack_bot_token: None,
            slack_channel_id: None,
            check_interval_secs: 0,
        }
    }
}

impl AppConfig {
    /// Load using env var + fallbacks:
    /// 1) $DIGEST_CONFIG_PATH (must exist)
    /// 2) config/digest.toml (optional)
    /// then environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_with(|k| env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Overlay values from an env-like lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SOURCE_OWNER") {
            self.source_owner = v;
        }
        if let Some(v) = get("SOURCE_REPO") {
            self.source_repo = v;
        }
        if let Some(v) = get("SOURCE_BRANCH") {
            self.source_branch = v;
        }
        if let Some(v) = get("STATE_FILE_PATH") {
            self.state_file = PathBuf::from(v);
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.github_token = Some(v);
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini_api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.gemini_model = v;
        }
        if let Some(v) = get("SUMMARY_TOPIC") {
            self.summary_topic = v;
        }
        if let Some(v) = get("SUMMARY_LANGUAGE") {
            self.summary_language = v;
        }
        if let Some(v) = get("SUMMARY_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.summary_concurrency = v;
        }
        if let Some(v) = get("SLACK_BOT_TOKEN") {
            self.slack_bot_token = Some(v);
        }
        if let Some(v) = get("SLACK_CHANNEL_ID") {
            self.slack_channel_id = Some(v);
        }
        if let Some(v) = get("CHECK_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.check_interval_secs = v;
        }
    }

    fn sanitize(&mut self) {
        if self.summary_concurrency == 0 {
            self.summary_concurrency = 1;
        }
    }

    pub fn source(&self) -> SourceIdentity {
        SourceIdentity::new(&self.source_owner, &self.source_repo, &self.source_branch)
    }

    pub fn prompt_options(&self) -> PromptOptions {
        PromptOptions {
            topic: self.summary_topic.clone(),
            language: self.summary_language.clone(),
        }
    }
}
