//! Environment-driven configuration for the webhook gateway.

use anyhow::{Context, Result, bail};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// React in-process through the Telegram Bot API.
    Bot,
    /// Hand each update to an external executable.
    Command,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub bind: SocketAddr,
    pub bot_token: Option<String>,
    pub secret_token: Option<String>,
    pub api_base: Option<String>,
    pub public_webhook_base: Option<String>,
    pub processor: ProcessorKind,
    pub command: Option<String>,
}

impl WebhookConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Lookup injection keeps the loader testable without mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("BIND").unwrap_or_else(|| "0.0.0.0:8080".into());
        let bind: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid BIND address {bind}"))?;

        let processor = match lookup("BOT_PROCESSOR").as_deref() {
            None | Some("bot") => ProcessorKind::Bot,
            Some("command") => ProcessorKind::Command,
            Some(other) => bail!("unknown BOT_PROCESSOR {other} (expected `bot` or `command`)"),
        };

        let cfg = Self {
            bind,
            bot_token: lookup("TELEGRAM_BOT_TOKEN"),
            secret_token: lookup("TELEGRAM_SECRET_TOKEN"),
            api_base: lookup("TELEGRAM_API_BASE"),
            public_webhook_base: lookup("TELEGRAM_PUBLIC_WEBHOOK_BASE"),
            processor,
            command: lookup("BOT_COMMAND"),
        };

        match cfg.processor {
            ProcessorKind::Bot if cfg.bot_token.is_none() => {
                bail!("TELEGRAM_BOT_TOKEN is required for the bot processor")
            }
            ProcessorKind::Command if cfg.command.is_none() => {
                bail!("BOT_COMMAND is required for the command processor")
            }
            _ => {}
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_applied() {
        let cfg =
            WebhookConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.processor, ProcessorKind::Bot);
        assert_eq!(cfg.bot_token.as_deref(), Some("123:abc"));
        assert!(cfg.secret_token.is_none());
        assert!(cfg.public_webhook_base.is_none());
    }

    #[test]
    fn command_mode_parses_fully() {
        let cfg = WebhookConfig::from_lookup(lookup_from(&[
            ("BIND", "127.0.0.1:9999"),
            ("BOT_PROCESSOR", "command"),
            ("BOT_COMMAND", "/usr/local/bin/bot"),
            ("TELEGRAM_SECRET_TOKEN", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:9999".parse().unwrap());
        assert_eq!(cfg.processor, ProcessorKind::Command);
        assert_eq!(cfg.command.as_deref(), Some("/usr/local/bin/bot"));
        assert_eq!(cfg.secret_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn bot_mode_requires_a_token() {
        let err = WebhookConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn command_mode_requires_a_command() {
        let err = WebhookConfig::from_lookup(lookup_from(&[("BOT_PROCESSOR", "command")]))
            .unwrap_err();
        assert!(err.to_string().contains("BOT_COMMAND"));
    }

    #[test]
    fn unknown_processor_kind_is_rejected() {
        let err = WebhookConfig::from_lookup(lookup_from(&[("BOT_PROCESSOR", "wasm")]))
            .unwrap_err();
        assert!(err.to_string().contains("BOT_PROCESSOR"));
    }

    #[test]
    fn invalid_bind_is_rejected() {
        let err = WebhookConfig::from_lookup(lookup_from(&[
            ("BIND", "not-an-addr"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BIND"));
    }
}
