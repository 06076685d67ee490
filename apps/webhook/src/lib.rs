//! Telegram bot webhook gateway.
//!
//! One HTTP endpoint receives webhook updates, hands each body to the
//! configured [`UpdateProcessor`], and maps the outcome onto a flat
//! status/body response. The processor is chosen once at startup; the
//! handler never knows which implementation it is talking to.

pub mod config;
pub mod registration;
pub mod reqid;
pub mod routes;

use anyhow::{Context, Result};
use botgate_processor::UpdateProcessor;
use botgate_processor::api::{HttpTelegramApi, TelegramApi};
use botgate_processor::bot::BotProcessor;
use botgate_processor::command::CommandProcessor;
use config::{ProcessorKind, WebhookConfig};
use registration::RegistrationOutcome;
use routes::AppState;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber configured from `RUST_LOG`.
pub fn init_telemetry() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Builds the shared state from config and serves until the listener dies.
pub async fn run(cfg: WebhookConfig) -> Result<()> {
    // One HTTP client and one API handle for the whole process lifetime.
    let api: Arc<dyn TelegramApi> = Arc::new(HttpTelegramApi::new(
        reqwest::Client::new(),
        cfg.api_base.clone(),
    ));

    let processor: Arc<dyn UpdateProcessor> = match cfg.processor {
        ProcessorKind::Bot => {
            let token = cfg
                .bot_token
                .clone()
                .context("bot processor needs TELEGRAM_BOT_TOKEN")?;
            Arc::new(BotProcessor::new(api.clone(), token))
        }
        ProcessorKind::Command => {
            let command = cfg
                .command
                .clone()
                .context("command processor needs BOT_COMMAND")?;
            Arc::new(CommandProcessor::new(command))
        }
    };

    let secret_token = match (cfg.public_webhook_base.as_deref(), cfg.bot_token.as_deref()) {
        (Some(base), Some(token)) => {
            reconcile_registration(api.as_ref(), token, base, cfg.secret_token.clone()).await
        }
        (Some(_), None) => {
            warn!("TELEGRAM_PUBLIC_WEBHOOK_BASE is set but TELEGRAM_BOT_TOKEN is missing; skipping registration");
            cfg.secret_token.clone()
        }
        _ => cfg.secret_token.clone(),
    };

    let app = routes::router(AppState {
        processor,
        secret_token,
    });

    info!("webhook gateway listening on {}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Reconciles webhook registration and decides which secret the handler
/// enforces. A freshly generated secret is only enforced when the
/// registration was actually applied: on a no-op Telegram keeps delivering
/// whatever secret was registered on an earlier boot, and that value is
/// not known here. Enforcing a new random one would lock every real
/// update out with 401 after a restart.
async fn reconcile_registration<TApi>(
    api: &TApi,
    bot_token: &str,
    public_base: &str,
    configured_secret: Option<String>,
) -> Option<String>
where
    TApi: TelegramApi + ?Sized,
{
    let want_url = format!(
        "{}{}",
        public_base.trim_end_matches('/'),
        routes::WEBHOOK_PATH
    );
    let generated = configured_secret.is_none();
    let secret = configured_secret
        .clone()
        .unwrap_or_else(registration::generate_secret);

    match registration::ensure_webhook(api, bot_token, &want_url, &secret).await {
        Ok(outcome) => {
            info!(?outcome, url = %want_url, "webhook registration reconciled");
            match outcome {
                RegistrationOutcome::Applied => Some(secret),
                RegistrationOutcome::Noop if generated => {
                    warn!(
                        "webhook already registered with a secret from an earlier boot; \
                         set TELEGRAM_SECRET_TOKEN to enforce the header"
                    );
                    None
                }
                RegistrationOutcome::Noop => Some(secret),
            }
        }
        Err(err) => {
            warn!(error = %err, "webhook registration failed; serving anyway");
            configured_secret
        }
    }
}
