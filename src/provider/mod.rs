mod command;
mod func;
mod http;

pub use command::CommandTool;
pub use func::FnTool;
pub use http::HttpTool;

use crate::config::{Config, ToolConfig, ToolKind, MIDPOINT_RANGE};
use crate::error::ToolError;
use crate::runner::RetryPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One independently invocable analysis.
///
/// Implementations are called concurrently with other tools and should stop
/// work once `cancel` fires; the orchestrator abandons the call either way.
#[async_trait]
pub trait AnalysisTool: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Percent reported once the primary external call has returned
    fn midpoint(&self) -> u8 {
        50
    }

    /// Overrides the orchestrator's default policy when set
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }

    async fn analyze(
        &self,
        address: &str,
        options: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError>;
}

/// Create a tool based on its configured kind
pub fn create_tool(
    config: &Config,
    tool: &ToolConfig,
    client: &reqwest::Client,
) -> Arc<dyn AnalysisTool> {
    let timeout = Duration::from_secs(tool.timeout_sec.unwrap_or(config.timeout_sec));
    let midpoint = tool
        .midpoint
        .clamp(*MIDPOINT_RANGE.start(), *MIDPOINT_RANGE.end());
    let retry = tool.retry.as_ref().map(RetryPolicy::from);

    match &tool.kind {
        ToolKind::Http { url, headers } => Arc::new(HttpTool {
            id: tool.id.clone(),
            name: tool.name.clone(),
            url: url.clone(),
            headers: headers.clone(),
            client: client.clone(),
            timeout,
            midpoint,
            retry,
        }),
        ToolKind::Command { program, args } => Arc::new(CommandTool {
            id: tool.id.clone(),
            name: tool.name.clone(),
            program: program.clone(),
            args: args.clone(),
            timeout,
            midpoint,
            retry,
        }),
    }
}

pub(crate) fn substitute_address(template: &str, address: &str) -> String {
    template.replace("{address}", address)
}
