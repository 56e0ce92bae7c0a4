//! Tool id to implementation lookup, built once and read-only afterwards.

use crate::config::Config;
use crate::error::{ConfigError, OrchestratorError};
use crate::provider::{create_tool, AnalysisTool};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct TaskRegistry {
    tools: HashMap<String, Arc<dyn AnalysisTool>>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn builder() -> TaskRegistryBuilder {
        TaskRegistryBuilder::default()
    }

    /// Build every enabled tool from the config
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("addrscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ConfigError::HttpClient)?;

        let registry = config
            .enabled_tools()
            .fold(Self::builder(), |builder, tool| {
                builder.register_arc(create_tool(config, tool, &client))
            })
            .build();

        Ok(registry)
    }

    pub fn resolve(&self, tool_id: &str) -> Result<Arc<dyn AnalysisTool>, OrchestratorError> {
        self.tools
            .get(tool_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownTool(tool_id.to_string()))
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.contains_key(tool_id)
    }

    pub fn display_name(&self, tool_id: &str) -> Option<&str> {
        self.tools.get(tool_id).map(|t| t.display_name())
    }

    /// Tool ids in registration order
    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Default)]
pub struct TaskRegistryBuilder {
    registry: TaskRegistry,
}

impl TaskRegistryBuilder {
    pub fn register<T: AnalysisTool + 'static>(self, tool: T) -> Self {
        self.register_arc(Arc::new(tool))
    }

    /// A later registration under the same id replaces the earlier one
    pub fn register_arc(mut self, tool: Arc<dyn AnalysisTool>) -> Self {
        let id = tool.id().to_string();
        if self.registry.tools.insert(id.clone(), tool).is_none() {
            self.registry.order.push(id);
        }
        self
    }

    pub fn build(self) -> TaskRegistry {
        self.registry
    }
}
