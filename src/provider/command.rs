use super::{substitute_address, AnalysisTool};
use crate::error::ToolError;
use crate::runner::RetryPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;
use tokio_util::sync::CancellationToken;

/// Runs an external analyzer process and reads its JSON output
pub struct CommandTool {
    pub id: String,
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub midpoint: u8,
    pub retry: Option<RetryPolicy>,
}

#[async_trait]
impl AnalysisTool for CommandTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn midpoint(&self) -> u8 {
        self.midpoint
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.clone()
    }

    async fn analyze(
        &self,
        address: &str,
        options: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        // Plain command names are resolved through PATH
        let binary_str = self.program.to_string_lossy();
        let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
            Command::new(&self.program)
        } else {
            Command::new(binary_str.as_ref())
        };

        cmd.args(self.args.iter().map(|arg| substitute_address(arg, address)))
            .env("ADDRSCAN_ADDRESS", address)
            .env("ADDRSCAN_OPTIONS", options.to_string())
            .kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            output = tokio_timeout(self.timeout, cmd.output()) => output
                .map_err(|_| ToolError::Timeout(self.timeout))?
                .map_err(ToolError::Io)?,
        };

        if !output.status.success() {
            return Err(ToolError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}
