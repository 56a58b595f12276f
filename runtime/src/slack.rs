//! Slack notification sink.

use async_trait::async_trait;
use regsweep_core::error::{Result, SweepError};
use serde::Deserialize;

use crate::source::NotificationSink;

/// Slack Web API base URL.
const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Fallback text shown in notifications and clients without block support.
const FALLBACK_TEXT: &str = "Report";

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Posts report messages to a Slack channel via `chat.postMessage`.
pub struct SlackNotifier {
    token: String,
    channel: String,
    max_message_length: usize,
    base_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(token: impl Into<String>, channel: impl Into<String>, max_message_length: usize) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
            max_message_length,
            base_url: SLACK_API_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different API host (e.g. a proxy).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "channel": self.channel,
            "text": FALLBACK_TEXT,
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": text },
                }
            ],
        })
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.build_request(text))
            .send()
            .await
            .map_err(|e| SweepError::Notification(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body: PostMessageResponse = response.json().await.map_err(|e| {
            SweepError::Notification(format!("unreadable response ({}): {}", status, e))
        })?;

        if !body.ok {
            return Err(SweepError::Notification(
                body.error.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        tracing::info!(ts = body.ts.as_deref().unwrap_or(""), "Slack message sent");
        Ok(())
    }
}
