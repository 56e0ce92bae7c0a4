use super::AnalysisTool;
use crate::error::ToolError;
use crate::runner::RetryPolicy;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A tool backed by an async closure, for embedding and tests
pub struct FnTool<F> {
    id: String,
    name: String,
    midpoint: u8,
    retry: Option<RetryPolicy>,
    func: F,
}

impl<F, Fut> FnTool<F>
where
    F: Fn(String, Value, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    pub fn new(id: impl Into<String>, name: impl Into<String>, func: F) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            midpoint: 50,
            retry: None,
            func,
        }
    }

    pub fn with_midpoint(mut self, midpoint: u8) -> Self {
        self.midpoint = midpoint;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}

#[async_trait]
impl<F, Fut> AnalysisTool for FnTool<F>
where
    F: Fn(String, Value, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
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
        (self.func)(address.to_string(), options.clone(), cancel.clone()).await
    }
}
