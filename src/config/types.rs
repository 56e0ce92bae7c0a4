use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Maximum number of tool invocations in flight per orchestrator
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-attempt timeout applied to tools that don't set their own
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// How long a finished run stays queryable
    #[serde(default = "default_retention_sec")]
    pub retention_sec: u64,

    #[serde(default = "default_janitor_interval_sec")]
    pub janitor_interval_sec: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Weights for the composite run score
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ScoringConfig {
    /// Points awarded for a fully successful run, scaled by success ratio
    #[serde(default = "default_success_weight")]
    pub success_weight: f64,

    /// Upper bound of the speed bonus; one point is lost per second of average tool time
    #[serde(default = "default_max_speed_bonus")]
    pub max_speed_bonus: f64,

    #[serde(default = "default_max_insights")]
    pub max_insights: usize,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            success_weight: default_success_weight(),
            max_speed_bonus: default_max_speed_bonus(),
            max_insights: default_max_insights(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ToolConfig {
    pub id: String,

    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(flatten)]
    pub kind: ToolKind,

    /// Progress percent reported once the primary call returns
    #[serde(default = "default_midpoint")]
    pub midpoint: u8,

    #[serde(default)]
    pub timeout_sec: Option<u64>,

    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolKind {
    /// GET a JSON document; `{address}` in the url is replaced with the analyzed address
    Http {
        url: String,

        #[serde(default)]
        headers: HashMap<String, String>,
    },

    /// Spawn a process and parse its stdout as JSON; `{address}` is substituted in args
    Command {
        program: PathBuf,

        #[serde(default)]
        args: Vec<String>,
    },
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolKind::Http { .. } => write!(f, "http"),
            ToolKind::Command { .. } => write!(f, "command"),
        }
    }
}
