//! In-process update processor backed by the Telegram Bot API.

use crate::api::TelegramApi;
use crate::update::Update;
use crate::{ProcessError, Processed, UpdateProcessor};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const START_REPLY: &str = "Hi! Send me a message and I will get back to you.";
const FALLBACK_REPLY: &str = "Got your message.";

/// Parses the raw body into an [`Update`] and executes the bot's reaction
/// through the shared API client. The client lives for the whole process;
/// nothing is constructed per update.
pub struct BotProcessor {
    api: Arc<dyn TelegramApi>,
    bot_token: String,
}

impl BotProcessor {
    pub fn new(api: Arc<dyn TelegramApi>, bot_token: impl Into<String>) -> Self {
        Self {
            api,
            bot_token: bot_token.into(),
        }
    }

    fn reply_for(text: &str) -> &'static str {
        let text = text.trim();
        if text == "/start" || text.starts_with("/start ") {
            START_REPLY
        } else {
            FALLBACK_REPLY
        }
    }
}

#[async_trait]
impl UpdateProcessor for BotProcessor {
    async fn process(&self, raw_update: &str) -> Result<Processed, ProcessError> {
        let update: Update = serde_json::from_str(raw_update)?;

        let Some(msg) = update.message() else {
            debug!(update_id = update.update_id, "update carries no message");
            return Ok(Processed::silent());
        };
        let Some(text) = msg.text.as_deref() else {
            debug!(
                update_id = update.update_id,
                chat_id = msg.chat.id,
                "message carries no text"
            );
            return Ok(Processed::silent());
        };

        self.api
            .send_message(
                &self.bot_token,
                msg.chat.id,
                Self::reply_for(text),
                Some(msg.message_id),
            )
            .await
            .map_err(ProcessError::Api)?;

        info!(
            update_id = update.update_id,
            chat_id = msg.chat.id,
            "replied to update"
        );
        Ok(Processed::silent())
    }
}
