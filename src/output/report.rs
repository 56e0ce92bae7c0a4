use crate::error::OutputError;
use crate::progress::ToolStatus;
use crate::runner::{ResultStatus, RunState};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

pub fn render_json(state: &RunState) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Render a run snapshot as a markdown report
pub fn render_markdown(state: &RunState) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Analysis of `{}`\n\n", state.metadata.address));

    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Run | `{}` |\n", state.run_id));
    md.push_str(&format!("| Status | {} |\n", state.status));
    md.push_str(&format!(
        "| Started | {} |\n",
        state.metadata.started_at.to_rfc3339()
    ));
    if let Some(summary) = &state.summary {
        md.push_str(&format!("| Score | {}/100 |\n", summary.overall_score));
        md.push_str(&format!(
            "| Tools | {} succeeded, {} failed |\n",
            summary.successful_tools, summary.failed_tools
        ));
        md.push_str(&format!(
            "| Total Time | {:.1}s |\n",
            summary.total_execution_time_ms as f64 / 1000.0
        ));
    }
    if let Some(error) = &state.error {
        md.push_str(&format!("| Error | {} |\n", error));
    }
    md.push_str("\n## Tools\n\n");

    md.push_str("| Tool | Status | Time |\n");
    md.push_str("|------|--------|------|\n");
    for progress in &state.progress {
        let result = state.result_for(&progress.tool_id);
        let status = match (progress.status, result.map(|r| r.status)) {
            (_, Some(ResultStatus::Success)) => "✅ success".to_string(),
            (_, Some(ResultStatus::Error)) => format!(
                "❌ error ({})",
                result.and_then(|r| r.error.as_deref()).unwrap_or("unknown")
            ),
            (ToolStatus::Running, None) => format!("⏳ running ({}%)", progress.percent),
            (status, None) => status.to_string(),
        };
        let time = result
            .map(|r| format!("{:.1}s", r.execution_time_ms as f64 / 1000.0))
            .unwrap_or_else(|| "-".to_string());

        md.push_str(&format!(
            "| {} | {} | {} |\n",
            progress.display_name, status, time
        ));
    }

    if let Some(summary) = &state.summary {
        push_list(&mut md, "Critical Issues", &summary.critical_issues);
        push_list(&mut md, "Key Insights", &summary.key_insights);
        push_list(&mut md, "Recommendations", &summary.recommendations);
    }

    md
}

fn push_list(md: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("\n## {}\n\n", title));
    for item in items {
        md.push_str(&format!("- {}\n", item));
    }
}

/// Write the rendered report, creating parent directories as needed
pub fn write_report(path: &Path, state: &RunState, format: ReportFormat) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(OutputError::CreateDir)?;
    }

    let content = match format {
        ReportFormat::Markdown => render_markdown(state),
        ReportFormat::Json => render_json(state)?,
    };
    fs::write(path, content).map_err(OutputError::WriteReport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::insights::Insights;
    use crate::progress::ToolProgress;
    use crate::runner::{compute_summary, RunMetadata, RunStatus, ToolResult};
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn completed_state() -> RunState {
        let results = vec![
            ToolResult::success(
                "balances",
                "Token Balances",
                json!({"eth": 3}),
                Insights {
                    insights: vec!["Holds 3 ETH".to_string()],
                    recommendations: vec![],
                },
                Duration::from_millis(1200),
            ),
            ToolResult::failure("risk", "Risk Scanner", "HTTP 503: down", Duration::from_millis(300)),
        ];
        let mut progress = vec![
            ToolProgress::pending("balances", "Token Balances"),
            ToolProgress::pending("risk", "Risk Scanner"),
        ];
        progress[0].apply(ToolStatus::Completed, 100, None);
        progress[1].apply(ToolStatus::Error, 0, Some("HTTP 503: down".to_string()));

        RunState {
            run_id: "run-1".to_string(),
            status: RunStatus::Completed,
            progress,
            summary: Some(compute_summary(&results, &ScoringConfig::default())),
            results,
            metadata: RunMetadata {
                address: "0xabc".to_string(),
                started_at: Utc::now(),
                tool_ids: vec!["balances".to_string(), "risk".to_string()],
            },
            completed_at: Some(Utc::now()),
            error: None,
        }
    }

    #[test]
    fn test_markdown_report_sections() {
        let md = render_markdown(&completed_state());

        assert!(md.starts_with("# Analysis of `0xabc`"));
        assert!(md.contains("| Token Balances | ✅ success | 1.2s |"));
        assert!(md.contains("❌ error (HTTP 503: down)"));
        assert!(md.contains("## Critical Issues\n\n- Error in Risk Scanner: HTTP 503: down"));
        assert!(md.contains("## Key Insights\n\n- Holds 3 ETH"));
        assert!(!md.contains("## Recommendations"));
    }

    #[test]
    fn test_write_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");

        write_report(&path, &completed_state(), ReportFormat::Json).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["runId"], "run-1");
        assert_eq!(written["summary"]["failedTools"], 1);
        assert_eq!(written["results"][0]["data"]["eth"], 3);
    }
}
