//! Startup webhook registration: makes sure Telegram pushes updates to
//! this gateway's public URL before we start serving.

use anyhow::{Context, Result};
use botgate_processor::api::TelegramApi;
use rand::Rng;
use tracing::info;

/// Update kinds the gateway knows how to interpret.
pub const DEFAULT_ALLOWED_UPDATES: [&str; 2] = ["message", "edited_message"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Applied,
    Noop,
}

/// Registers the webhook when the currently registered URL differs from
/// the desired one. Pending updates are dropped only on first install
/// (no URL registered yet).
pub async fn ensure_webhook<TApi>(
    api: &TApi,
    bot_token: &str,
    want_url: &str,
    secret: &str,
) -> Result<RegistrationOutcome>
where
    TApi: TelegramApi + ?Sized,
{
    let current = api
        .get_webhook_info(bot_token)
        .await
        .context("get webhook info")?;
    let current_url = current.url.trim();

    if urls_match(current_url, want_url) && !current_url.is_empty() {
        info!(url = %want_url, "webhook already registered");
        return Ok(RegistrationOutcome::Noop);
    }

    let first_install = current_url.is_empty();
    let allowed: Vec<String> = DEFAULT_ALLOWED_UPDATES
        .iter()
        .map(|s| s.to_string())
        .collect();
    api.set_webhook(bot_token, want_url, secret, &allowed, first_install)
        .await
        .with_context(|| format!("set webhook for {want_url}"))?;

    info!(
        url = %want_url,
        previous = %current_url,
        drop_pending = first_install,
        "webhook registered"
    );
    Ok(RegistrationOutcome::Applied)
}

pub fn urls_match(current: &str, desired: &str) -> bool {
    current.trim_end_matches('/') == desired.trim_end_matches('/')
}

/// Random secret for the `X-Telegram-Bot-Api-Secret-Token` header when the
/// operator did not configure one.
pub fn generate_secret() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::rng();
    (0..32)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use botgate_processor::api::WebhookInfo;
    use tokio::sync::Mutex;

    type SetCallLog = Mutex<Vec<(String, String, Vec<String>, bool)>>;

    struct MockApi {
        current_url: String,
        set_calls: SetCallLog,
    }

    impl MockApi {
        fn new(current_url: &str) -> Self {
            Self {
                current_url: current_url.to_string(),
                set_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TelegramApi for MockApi {
        async fn send_message(
            &self,
            _bot_token: &str,
            _chat_id: i64,
            _text: &str,
            _reply_to: Option<i64>,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_webhook_info(&self, _bot_token: &str) -> anyhow::Result<WebhookInfo> {
            Ok(WebhookInfo {
                url: self.current_url.clone(),
                extra: Default::default(),
            })
        }

        async fn set_webhook(
            &self,
            _bot_token: &str,
            url: &str,
            secret: &str,
            allowed_updates: &[String],
            drop_pending: bool,
        ) -> anyhow::Result<()> {
            self.set_calls.lock().await.push((
                url.to_string(),
                secret.to_string(),
                allowed_updates.to_vec(),
                drop_pending,
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn registers_on_first_install_and_drops_pending() {
        let api = MockApi::new("");
        let outcome = ensure_webhook(&api, "token", "https://hook/telegram/webhook", "s")
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Applied);
        let calls = api.set_calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (url, secret, allowed, drop_pending) = &calls[0];
        assert_eq!(url, "https://hook/telegram/webhook");
        assert_eq!(secret, "s");
        assert_eq!(allowed, &vec!["message".to_string(), "edited_message".to_string()]);
        assert!(drop_pending);
    }

    #[tokio::test]
    async fn reregisters_without_dropping_when_url_differs() {
        let api = MockApi::new("https://old/telegram/webhook");
        let outcome = ensure_webhook(&api, "token", "https://new/telegram/webhook", "s")
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Applied);
        let calls = api.set_calls.lock().await;
        assert!(!calls[0].3, "pending updates kept on re-registration");
    }

    #[tokio::test]
    async fn whitespace_only_url_counts_as_first_install() {
        let api = MockApi::new("   ");
        let outcome = ensure_webhook(&api, "token", "https://hook/telegram/webhook", "s")
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Applied);
        let calls = api.set_calls.lock().await;
        assert!(calls[0].3, "pending updates dropped on first install");
    }

    #[tokio::test]
    async fn noop_when_url_already_matches() {
        let api = MockApi::new("https://hook/telegram/webhook/");
        let outcome = ensure_webhook(&api, "token", "https://hook/telegram/webhook", "s")
            .await
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::Noop);
        assert!(api.set_calls.lock().await.is_empty());
    }

    #[test]
    fn generated_secrets_are_32_chars_from_the_alphabet() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 32);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
