use crate::error::OrchestratorError;
use crate::insights::Insights;
use crate::progress::ToolProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use super::summary::Summary;

/// What to analyze and with which tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub address: String,
    pub tool_ids: Vec<String>,
    /// Passed through untouched to every tool
    #[serde(default)]
    pub options: Value,
}

impl RunRequest {
    pub fn new<I, S>(address: impl Into<String>, tool_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            address: address.into(),
            tool_ids: tool_ids.into_iter().map(Into::into).collect(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Validate and return the distinct tool ids in first-seen order
    pub fn distinct_tool_ids(&self) -> Result<Vec<String>, OrchestratorError> {
        if self.address.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "address must not be empty".to_string(),
            ));
        }
        if self.tool_ids.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "at least one tool id is required".to_string(),
            ));
        }
        if self.tool_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(OrchestratorError::InvalidRequest(
                "tool ids must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        Ok(self
            .tool_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub address: String,
    pub started_at: DateTime<Utc>,
    pub tool_ids: Vec<String>,
}

/// Snapshot of a run; the orchestrator only ever hands out copies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: String,
    pub status: RunStatus,
    /// One entry per tool, in request order
    pub progress: Vec<ToolProgress>,
    /// One entry per settled tool, in settle order
    pub results: Vec<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when the run failed before any tool was scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    pub fn progress_for(&self, tool_id: &str) -> Option<&ToolProgress> {
        self.progress.iter().find(|p| p.tool_id == tool_id)
    }

    pub fn result_for(&self, tool_id: &str) -> Option<&ToolResult> {
        self.results.iter().find(|r| r.tool_id == tool_id)
    }

    /// Overall completion across tools, 0-100
    pub fn percent_complete(&self) -> u8 {
        if self.progress.is_empty() {
            return 0;
        }
        let total: u32 = self
            .progress
            .iter()
            .map(|p| if p.status.is_terminal() { 100 } else { u32::from(p.percent) })
            .sum();
        (total / self.progress.len() as u32) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_id: String,
    pub display_name: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

impl ToolResult {
    pub fn success(
        tool_id: impl Into<String>,
        display_name: impl Into<String>,
        data: Value,
        insights: Insights,
        elapsed: Duration,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            display_name: display_name.into(),
            status: ResultStatus::Success,
            data: Some(data),
            insights: insights.insights,
            recommendations: insights.recommendations,
            error: None,
            execution_time_ms: elapsed_ms(elapsed),
        }
    }

    pub fn failure(
        tool_id: impl Into<String>,
        display_name: impl Into<String>,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            display_name: display_name.into(),
            status: ResultStatus::Error,
            data: None,
            insights: Vec::new(),
            recommendations: Vec::new(),
            error: Some(error.into()),
            execution_time_ms: elapsed_ms(elapsed),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
