use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddrscanError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AddrscanError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Tool id must not be empty")]
    EmptyToolId,

    #[error("Tool '{0}' is defined more than once")]
    DuplicateTool(String),

    #[error("Tool '{tool}' has midpoint {midpoint}, expected 40..=75")]
    InvalidMidpoint { tool: String, midpoint: u8 },

    #[error("Backoff multiplier must be greater than 1, got {0}")]
    InvalidMultiplier(f64),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Raw failure reported by a tool invocation, before classification
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Failed to decode tool output: {0}")]
    Decode(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Network,
    Timeout,
    Http,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Network => write!(f, "network"),
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::Http => write!(f, "http"),
            ErrorCode::Cancelled => write!(f, "cancelled"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// A tool failure normalized into a code and a retry verdict
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    pub message: String,
    pub http_status: Option<u16>,
    pub code: ErrorCode,
    pub is_retryable: bool,
}

impl ClassifiedError {
    pub fn cancelled() -> Self {
        Self {
            message: ToolError::Cancelled.to_string(),
            http_status: None,
            code: ErrorCode::Cancelled,
            is_retryable: false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
