//! Thin Telegram Bot API client used by the in-process processor and by
//! webhook registration at startup.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tokio::time::sleep;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Telegram wraps every method result in `{ok, result, description}`.
#[derive(Debug, Clone, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn send_message(
        &self,
        bot_token: &str,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()>;

    async fn get_webhook_info(&self, bot_token: &str) -> Result<WebhookInfo>;

    async fn set_webhook(
        &self,
        bot_token: &str,
        url: &str,
        secret: &str,
        allowed_updates: &[String],
        drop_pending: bool,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpTelegramApi {
    client: Client,
    api_base: String,
}

impl HttpTelegramApi {
    /// The `Client` is expected to be built once at startup and shared.
    pub fn new(client: Client, api_base: Option<String>) -> Self {
        let api_base = api_base.unwrap_or_else(|| DEFAULT_API_BASE.into());
        Self { client, api_base }
    }

    fn url(&self, bot_token: &str, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            bot_token,
            method
        )
    }

    async fn with_retry<F, Fut, T>(mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let delays = [
            Duration::from_millis(250),
            Duration::from_secs(1),
            Duration::from_secs(4),
        ];
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(_err) if attempt < delays.len() => {
                    sleep(delays[attempt]).await;
                    attempt += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn invoke<T>(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let res = req
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .with_context(|| format!("telegram {what} request"))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("telegram {what} {}: {}", status, body));
        }
        let body: ApiEnvelope<T> = res
            .json()
            .await
            .with_context(|| format!("decode telegram {what} response"))?;
        if body.ok {
            Ok(body.result)
        } else {
            Err(anyhow!(
                "telegram {what} failed: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            ))
        }
    }
}

#[async_trait]
impl TelegramApi for HttpTelegramApi {
    async fn send_message(
        &self,
        bot_token: &str,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let endpoint = self.url(bot_token, "sendMessage");
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(reply_to) = reply_to {
            payload["reply_to_message_id"] = reply_to.into();
        }
        Self::with_retry(|| async {
            self.invoke::<Value>(self.client.post(&endpoint).json(&payload), "sendMessage")
                .await
        })
        .await?;
        Ok(())
    }

    async fn get_webhook_info(&self, bot_token: &str) -> Result<WebhookInfo> {
        let endpoint = self.url(bot_token, "getWebhookInfo");
        let info = Self::with_retry(|| async {
            self.invoke::<WebhookInfo>(self.client.get(&endpoint), "getWebhookInfo")
                .await
        })
        .await?;
        Ok(info.unwrap_or_default())
    }

    async fn set_webhook(
        &self,
        bot_token: &str,
        url: &str,
        secret: &str,
        allowed_updates: &[String],
        drop_pending: bool,
    ) -> Result<()> {
        let endpoint = self.url(bot_token, "setWebhook");
        let payload = serde_json::json!({
            "url": url,
            "secret_token": secret,
            "allowed_updates": allowed_updates,
            "drop_pending_updates": drop_pending,
        });
        Self::with_retry(|| async {
            self.invoke::<Value>(self.client.post(&endpoint).json(&payload), "setWebhook")
                .await
        })
        .await?;
        Ok(())
    }
}
