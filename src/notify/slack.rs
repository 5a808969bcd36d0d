use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::format::{MessageBlock, TextKind};
use super::{ChatSink, OutboundMessage};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackNotifier {
    bot_token: Option<String>,
    channel_id: Option<String>,
    endpoint: String,
    client: Client,
}

#[derive(Deserialize)]
struct SlackReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    /// Delivery is disabled (with a warning) unless both token and channel are set.
    pub fn new(bot_token: Option<String>, channel_id: Option<String>) -> Self {
        let bot_token = bot_token.filter(|t| !t.trim().is_empty());
        let channel_id = channel_id.filter(|c| !c.trim().is_empty());
        if bot_token.is_none() || channel_id.is_none() {
            tracing::warn!("SLACK_BOT_TOKEN or SLACK_CHANNEL_ID is not set, notifications will be skipped");
        }
        Self {
            bot_token,
            channel_id,
            endpoint: POST_MESSAGE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Override the API endpoint (Slack-compatible gateways, local stubs).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.channel_id.is_some()
    }
}

fn text_object(text: &str, kind: TextKind) -> Value {
    match kind {
        TextKind::Plain => json!({ "type": "plain_text", "text": text, "emoji": true }),
        TextKind::RichText => json!({ "type": "mrkdwn", "text": text }),
    }
}

/// Block Kit JSON for one block.
pub fn block_json(block: &MessageBlock) -> Value {
    match block {
        MessageBlock::Header(text) => json!({
            "type": "header",
            "text": text_object(text, TextKind::Plain),
        }),
        MessageBlock::Section { text, kind } => json!({
            "type": "section",
            "text": text_object(text, *kind),
        }),
        MessageBlock::Divider => json!({ "type": "divider" }),
    }
}

pub fn payload(channel: &str, msg: &OutboundMessage) -> Value {
    json!({
        "channel": channel,
        "text": msg.text,
        "blocks": msg.blocks.iter().map(block_json).collect::<Vec<_>>(),
        "mrkdwn": true,
    })
}

#[async_trait::async_trait]
impl ChatSink for SlackNotifier {
    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        let (Some(token), Some(channel)) = (&self.bot_token, &self.channel_id) else {
            tracing::debug!("Slack disabled, skipping notification");
            return Ok(());
        };

        let reply: SlackReply = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&payload(channel, msg))
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?
            .json()
            .await
            .context("slack reply")?;

        if !reply.ok {
            bail!(
                "slack rejected message: {}",
                reply.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
