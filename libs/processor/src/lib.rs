//! Update-processing capability for the botgate webhook gateway.
//!
//! The gateway hands every POSTed webhook body to an [`UpdateProcessor`].
//! Two interchangeable implementations exist: [`bot::BotProcessor`] reacts
//! in-process through the Telegram Bot API, and
//! [`command::CommandProcessor`] hands the payload to an external
//! executable. The HTTP layer only ever sees the trait.

pub mod api;
pub mod bot;
pub mod command;
pub mod update;

use async_trait::async_trait;
use thiserror::Error;

/// Successful processing outcome. `output` is surfaced verbatim as the
/// HTTP response body when present; otherwise the gateway answers "OK".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    pub output: Option<String>,
}

impl Processed {
    /// Success with nothing to say.
    pub fn silent() -> Self {
        Self { output: None }
    }

    /// Success carrying text collected from the processor.
    pub fn with_output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
        }
    }
}

/// Structured failure reasons. The HTTP layer collapses all of these into
/// one generic 500; the detail exists for logs and metrics only.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("malformed update payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("bot api call failed: {0}")]
    Api(anyhow::Error),

    #[error("failed to spawn bot command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bot command exited with status {code:?}")]
    Exit { code: Option<i32> },
}

impl ProcessError {
    /// Short stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Malformed(_) => "malformed",
            ProcessError::Api(_) => "api",
            ProcessError::Spawn { .. } => "spawn",
            ProcessError::Exit { .. } => "exit",
        }
    }
}

/// One webhook body in, one success-or-failure verdict out.
#[async_trait]
pub trait UpdateProcessor: Send + Sync {
    async fn process(&self, raw_update: &str) -> Result<Processed, ProcessError>;
}
