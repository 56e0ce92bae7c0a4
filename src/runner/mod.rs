mod classify;
mod executor;
mod orchestrator;
mod retry;
mod summary;
mod types;

pub use classify::classify;
pub use orchestrator::Orchestrator;
pub use retry::{retry_with_backoff, RetryExecutor, RetryPolicy, RetryPredicate};
pub use summary::{compute_summary, overall_score, Summary};
pub use types::{ResultStatus, RunMetadata, RunRequest, RunState, RunStatus, ToolResult};
