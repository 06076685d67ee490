use anyhow::Result;
use botgate_webhook::config::WebhookConfig;

#[tokio::main]
async fn main() -> Result<()> {
    botgate_webhook::init_telemetry();
    let cfg = WebhookConfig::from_env()?;
    botgate_webhook::run(cfg).await
}
