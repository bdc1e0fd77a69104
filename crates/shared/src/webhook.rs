use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Where the finished digest goes
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct TextMessage<'a> {
    msg_type: &'static str,
    content: TextContent<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

/// Feishu/Lark custom bot webhook
pub struct FeishuWebhook {
    client: Client,
    url: String,
}

impl FeishuWebhook {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for FeishuWebhook {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = TextMessage {
            msg_type: "text",
            content: TextContent { text },
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send webhook request")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Webhook returned {}: {}", status, body);
        }

        check_bot_reply(&body)?;
        info!(status = %status, "Digest delivered");
        Ok(())
    }
}

/// The bot answers 200 even for rejected messages; the real verdict is `code` (or the older `StatusCode`).
fn check_bot_reply(body: &str) -> Result<()> {
    let Ok(reply) = serde_json::from_str::<Value>(body) else {
        return Ok(());
    };

    let code = reply
        .get("code")
        .or_else(|| reply.get("StatusCode"))
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if code != 0 {
        let msg = reply
            .get("msg")
            .or_else(|| reply.get("StatusMessage"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        anyhow::bail!("Webhook rejected message (code {}): {}", code, msg);
    }

    Ok(())
}
