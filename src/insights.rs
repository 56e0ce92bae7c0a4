use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Derives human-readable insights from a tool's raw data.
///
/// Called once per successful tool; failures are swallowed by the caller.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(
        &self,
        tool_id: &str,
        data: &Value,
        address: &str,
    ) -> Result<Insights, ToolError>;
}

/// Reads `insights` and `recommendations` string arrays straight from the data
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFieldInsights;

#[async_trait]
impl InsightGenerator for DataFieldInsights {
    async fn generate(
        &self,
        tool_id: &str,
        data: &Value,
        _address: &str,
    ) -> Result<Insights, ToolError> {
        let Some(object) = data.as_object() else {
            tracing::debug!("Tool {} returned non-object data, no insights", tool_id);
            return Ok(Insights::default());
        };

        Ok(Insights {
            insights: string_list(object.get("insights")),
            recommendations: string_list(object.get("recommendations")),
        })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reads_string_arrays() {
        let data = json!({
            "insights": ["High DEX activity", "", 42, "Holds governance tokens"],
            "recommendations": "Review token approvals",
        });

        let insights = DataFieldInsights
            .generate("defi", &data, "0xabc")
            .await
            .unwrap();

        assert_eq!(
            insights.insights,
            vec!["High DEX activity", "Holds governance tokens"]
        );
        assert_eq!(insights.recommendations, vec!["Review token approvals"]);
    }

    #[tokio::test]
    async fn test_non_object_data_yields_nothing() {
        let insights = DataFieldInsights
            .generate("defi", &json!("plain"), "0xabc")
            .await
            .unwrap();
        assert_eq!(insights, Insights::default());
    }
}
