use crate::config::ScoringConfig;
use serde::{Deserialize, Serialize};

use super::types::ToolResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_tools: usize,
    pub completed_tools: usize,
    pub successful_tools: usize,
    pub failed_tools: usize,
    pub total_execution_time_ms: u64,
    pub key_insights: Vec<String>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub overall_score: u8,
}

/// Aggregate settled tool results into the run summary
pub fn compute_summary(results: &[ToolResult], scoring: &ScoringConfig) -> Summary {
    let total_tools = results.len();
    let successful_tools = results.iter().filter(|r| r.is_success()).count();
    let failed_tools = total_tools - successful_tools;
    let total_execution_time_ms: u64 = results.iter().map(|r| r.execution_time_ms).sum();

    let key_insights = results
        .iter()
        .flat_map(|r| r.insights.iter().cloned())
        .take(scoring.max_insights)
        .collect();

    let recommendations = results
        .iter()
        .flat_map(|r| r.recommendations.iter().cloned())
        .take(scoring.max_recommendations)
        .collect();

    let critical_issues = results
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| {
            format!(
                "Error in {}: {}",
                r.display_name,
                r.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    Summary {
        total_tools,
        completed_tools: total_tools,
        successful_tools,
        failed_tools,
        total_execution_time_ms,
        key_insights,
        critical_issues,
        recommendations,
        overall_score: overall_score(
            successful_tools,
            total_tools,
            total_execution_time_ms,
            scoring,
        ),
    }
}

/// Success ratio scaled to `success_weight`, plus a speed bonus that loses one
/// point per second of average tool time. No bonus when nothing succeeded.
pub fn overall_score(
    successful: usize,
    total: usize,
    total_execution_time_ms: u64,
    scoring: &ScoringConfig,
) -> u8 {
    if total == 0 {
        return 0;
    }

    let success_ratio = successful as f64 / total as f64;
    let avg_secs = total_execution_time_ms as f64 / total as f64 / 1000.0;
    let speed_bonus = if successful > 0 {
        (scoring.max_speed_bonus - avg_secs).clamp(0.0, scoring.max_speed_bonus.max(0.0))
    } else {
        0.0
    };

    let score = (success_ratio * scoring.success_weight + speed_bonus).clamp(0.0, 100.0);
    score.round() as u8
}
