//! LINE Messaging API client.
//!
//! Sends replies with the push API (webhook reply tokens expire long before a
//! streamed agent turn finishes) and shows the loading animation in direct chats.
//!
//! # Endpoints
//!
//! - `POST /v2/bot/message/push`: one text message per call
//! - `POST /v2/bot/chat/loading/start`: loading animation, one-to-one chats only

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::LineConfig;
use crate::error::{AgentLineError, Result};
use crate::utils::string::prefix_chars;

use super::{OutboundMessage, PushSender};

/// LINE text message character limit.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Push/loading client authenticated with the channel access token.
pub struct LineClient {
    client: Client,
    api_base: String,
    access_token: String,
    loading_seconds: u32,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &LineConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.channel_access_token.clone(),
            loading_seconds: config.loading_seconds,
        }
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<()> {
        let endpoint = format!("{}{}", self.api_base, path);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AgentLineError::Channel(format!("LINE API request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: Value = response.json().await.unwrap_or_default();
        let detail = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown API error");
        Err(AgentLineError::Channel(format!(
            "LINE API error {} on {}: {}",
            status, path, detail
        )))
    }
}

#[async_trait]
impl PushSender for LineClient {
    async fn push(&self, msg: OutboundMessage) -> Result<()> {
        let to = msg.to.trim();
        if to.is_empty() {
            return Err(AgentLineError::Channel(
                "LINE push destination cannot be empty".to_string(),
            ));
        }

        let text = msg.text.trim();
        if text.is_empty() {
            debug!(to = %to, "Skipping blank push message");
            return Ok(());
        }

        let payload = json!({
            "to": to,
            "messages": [{
                "type": "text",
                "text": prefix_chars(text, MAX_MESSAGE_CHARS),
            }]
        });

        self.post("/v2/bot/message/push", &payload).await.map_err(|e| {
            warn!(to = %to, error = %e, "LINE push failed");
            e
        })
    }

    async fn show_loading(&self, chat_id: &str) -> Result<()> {
        let payload = json!({
            "chatId": chat_id,
            "loadingSeconds": self.loading_seconds,
        });
        self.post("/v2/bot/chat/loading/start", &payload).await
    }
}
