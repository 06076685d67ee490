//! Out-of-process update processor: hands the payload to an executable.
//!
//! The raw webhook body travels through the `TELEGRAM_UPDATE` environment
//! variable, not stdin. Whatever the command writes to stdout becomes the
//! response body; stderr is logged and never surfaced to the caller.

use crate::{ProcessError, Processed, UpdateProcessor};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable carrying the raw webhook body.
pub const UPDATE_ENV_VAR: &str = "TELEGRAM_UPDATE";

pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
}

impl CommandProcessor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

#[async_trait]
impl UpdateProcessor for CommandProcessor {
    async fn process(&self, raw_update: &str) -> Result<Processed, ProcessError> {
        // `output()` waits for exit and drains both pipes, so no handle
        // outlives the invocation.
        let output = Command::new(&self.program)
            .args(&self.args)
            .env(UPDATE_ENV_VAR, raw_update)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if !line.trim().is_empty() {
                warn!(command = %self.program, "bot command stderr: {line}");
            }
        }

        if !output.status.success() {
            return Err(ProcessError::Exit {
                code: output.status.code(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        debug!(
            command = %self.program,
            bytes = output.stdout.len(),
            "bot command finished"
        );
        if text.is_empty() {
            Ok(Processed::silent())
        } else {
            Ok(Processed::with_output(text))
        }
    }
}
