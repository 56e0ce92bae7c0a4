mod defaults;
mod types;

pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const MIDPOINT_RANGE: std::ops::RangeInclusive<u8> = 40..=75;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            concurrency: default_concurrency(),
            timeout_sec: default_timeout_sec(),
            retention_sec: default_retention_sec(),
            janitor_interval_sec: default_janitor_interval_sec(),
            retry: RetryConfig::default(),
            scoring: ScoringConfig::default(),
            tools: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_multiplier(&self.retry)?;

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if tool.id.trim().is_empty() {
                return Err(ConfigError::EmptyToolId);
            }
            if !seen.insert(tool.id.as_str()) {
                return Err(ConfigError::DuplicateTool(tool.id.clone()));
            }
            if !MIDPOINT_RANGE.contains(&tool.midpoint) {
                return Err(ConfigError::InvalidMidpoint {
                    tool: tool.id.clone(),
                    midpoint: tool.midpoint,
                });
            }
            if let Some(ref retry) = tool.retry {
                check_multiplier(retry)?;
            }
        }

        Ok(())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_sec)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_sec)
    }

    pub fn enabled_tools(&self) -> impl Iterator<Item = &ToolConfig> {
        self.tools.iter().filter(|t| t.enabled)
    }
}

fn check_multiplier(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.backoff_multiplier <= 1.0 || !retry.backoff_multiplier.is_finite() {
        return Err(ConfigError::InvalidMultiplier(retry.backoff_multiplier));
    }
    Ok(())
}
