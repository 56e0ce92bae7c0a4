use super::{substitute_address, AnalysisTool};
use crate::error::ToolError;
use crate::runner::RetryPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Fetches a JSON document from a REST endpoint
pub struct HttpTool {
    pub id: String,
    pub name: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub client: reqwest::Client,
    pub timeout: Duration,
    pub midpoint: u8,
    pub retry: Option<RetryPolicy>,
}

impl HttpTool {
    /// Scalar option values are forwarded as query parameters
    fn query_pairs(options: &Value) -> Vec<(String, String)> {
        let Some(map) = options.as_object() else {
            return Vec::new();
        };

        map.iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key.clone(), s.clone())),
                Value::Number(n) => Some((key.clone(), n.to_string())),
                Value::Bool(b) => Some((key.clone(), b.to_string())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AnalysisTool for HttpTool {
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
        _cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        let url = substitute_address(&self.url, address);
        debug!(url = %url, tool = %self.id, "GET request");

        let mut request = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(&Self::query_pairs(options));
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("request failed");
            let message = match body.trim() {
                "" => reason.to_string(),
                text => format!("{}: {}", reason, text.chars().take(200).collect::<String>()),
            };
            return Err(ToolError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Decode(e.to_string()))
    }
}
