//! Per-tool progress records and the transition rules that guard them.
//!
//! Updates arrive from concurrent task units and may be duplicated or out of
//! order, so an invalid transition is silently dropped instead of failing.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl ToolStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed | Self::Error => 2,
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolStatus::Pending => write!(f, "pending"),
            ToolStatus::Running => write!(f, "running"),
            ToolStatus::Completed => write!(f, "completed"),
            ToolStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProgress {
    pub tool_id: String,
    pub display_name: String,
    pub status: ToolStatus,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolProgress {
    pub fn pending(tool_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            display_name: display_name.into(),
            status: ToolStatus::Pending,
            percent: 0,
            error: None,
        }
    }

    /// Apply an update, returning whether anything changed.
    ///
    /// Status only moves forward (Pending, Running, then Completed or Error) and
    /// a Running percent never decreases.
    pub fn apply(&mut self, status: ToolStatus, percent: u8, error: Option<String>) -> bool {
        let percent = percent.min(100);

        if self.status.is_terminal() || status.rank() < self.status.rank() {
            debug!(
                "Ignoring {} -> {} for {}",
                self.status, status, self.tool_id
            );
            return false;
        }

        if status == self.status {
            if status != ToolStatus::Running || percent <= self.percent {
                return false;
            }
            self.percent = percent;
            return true;
        }

        self.status = status;
        self.percent = percent;
        if status == ToolStatus::Error {
            self.error = error;
        }
        true
    }
}
