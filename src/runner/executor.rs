use crate::config::MIDPOINT_RANGE;
use crate::insights::{InsightGenerator, Insights};
use crate::progress::ToolStatus;
use crate::registry::TaskRegistry;
use crate::store::RunEntry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::retry::{RetryExecutor, RetryPolicy};
use super::types::ToolResult;

pub(super) const DISPATCH_PERCENT: u8 = 10;
pub(super) const INSIGHTS_PERCENT: u8 = 90;

/// Everything one task unit needs to drive a single tool to completion
pub(super) struct TaskUnit {
    pub run: Arc<RunEntry>,
    pub run_id: String,
    pub tool_id: String,
    pub display_name: String,
    pub address: Arc<str>,
    pub options: Arc<Value>,
    pub registry: Arc<TaskRegistry>,
    pub insights: Arc<dyn InsightGenerator>,
    pub executor: Arc<RetryExecutor>,
    pub semaphore: Arc<Semaphore>,
    pub default_policy: RetryPolicy,
    pub cancel: CancellationToken,
}

impl TaskUnit {
    fn fail(&self, error: impl Into<String>, start: Instant) -> ToolResult {
        let result = ToolResult::failure(
            self.tool_id.clone(),
            self.display_name.clone(),
            error,
            start.elapsed(),
        );
        self.run.settle(result.clone());
        result
    }
}

/// Drive one tool through dispatch, retrying execution, and insight generation.
///
/// Never fails: every outcome, cancellation included, is settled into the run
/// as a `ToolResult`.
pub(super) async fn execute_tool(unit: TaskUnit) -> ToolResult {
    let start = Instant::now();

    let tool = match unit.registry.resolve(&unit.tool_id) {
        Ok(tool) => tool,
        Err(e) => {
            warn!("Run {}: {}", unit.run_id, e);
            return unit.fail(e.to_string(), start);
        }
    };

    let _permit = tokio::select! {
        biased;
        _ = unit.cancel.cancelled() => return unit.fail("cancelled", start),
        permit = unit.semaphore.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(e) => return unit.fail(e.to_string(), start),
        },
    };

    unit.run
        .set_status(&unit.tool_id, ToolStatus::Running, DISPATCH_PERCENT, None);

    let policy = tool.retry_policy().unwrap_or_else(|| unit.default_policy.clone());
    let request_id = format!("{}:{}", unit.run_id, unit.tool_id);
    debug!("Dispatching {} with {:?}", request_id, policy);

    let tool_ref = tool.as_ref();
    let address: &str = &unit.address;
    let options: &Value = &unit.options;
    let cancel = &unit.cancel;

    let outcome = unit
        .executor
        .execute(&request_id, &policy, cancel, move || {
            tool_ref.analyze(address, options, cancel)
        })
        .await;

    let data = match outcome {
        Ok(data) => data,
        Err(e) => {
            warn!("Tool {} failed in run {}: {}", unit.tool_id, unit.run_id, e);
            return unit.fail(e.message, start);
        }
    };

    let midpoint = tool
        .midpoint()
        .clamp(*MIDPOINT_RANGE.start(), *MIDPOINT_RANGE.end());
    unit.run
        .set_status(&unit.tool_id, ToolStatus::Running, midpoint, None);
    unit.run
        .set_status(&unit.tool_id, ToolStatus::Running, INSIGHTS_PERCENT, None);

    let generated = tokio::select! {
        biased;
        _ = unit.cancel.cancelled() => return unit.fail("cancelled", start),
        generated = unit.insights.generate(&unit.tool_id, &data, address) => generated,
    };
    let insights = generated.unwrap_or_else(|e| {
        debug!("Insight generation for {} failed: {}", unit.tool_id, e);
        Insights::default()
    });

    let result = ToolResult::success(
        unit.tool_id.clone(),
        unit.display_name.clone(),
        data,
        insights,
        start.elapsed(),
    );
    unit.run.settle(result.clone());

    info!(
        "Completed {}: {} insights ({}ms)",
        unit.tool_id,
        result.insights.len(),
        result.execution_time_ms
    );
    result
}
