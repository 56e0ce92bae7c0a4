use crate::config::{Config, ScoringConfig};
use crate::error::OrchestratorError;
use crate::insights::{DataFieldInsights, InsightGenerator};
use crate::progress::ToolProgress;
use crate::registry::TaskRegistry;
use crate::store::{RunEntry, RunStore};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::executor::{execute_tool, TaskUnit};
use super::retry::{RetryExecutor, RetryPolicy};
use super::summary::compute_summary;
use super::types::{RunMetadata, RunRequest, RunState, RunStatus, ToolResult};

/// Owns run lifecycles: fans each run out to one task per tool and folds the
/// settled results into a summary.
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    insights: Arc<dyn InsightGenerator>,
    store: Arc<RunStore>,
    executor: Arc<RetryExecutor>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
    scoring: ScoringConfig,
    retention: Duration,
    janitor_interval: Duration,
}

impl Orchestrator {
    pub fn new(config: &Config, registry: TaskRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            insights: Arc::new(DataFieldInsights),
            store: Arc::new(RunStore::new()),
            executor: Arc::new(RetryExecutor::new()),
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            retry: RetryPolicy::from(&config.retry),
            scoring: config.scoring.clone(),
            retention: config.retention(),
            janitor_interval: config.janitor_interval(),
        }
    }

    /// Validate the config and build an orchestrator over its enabled tools
    pub fn from_config(config: &Config) -> crate::error::Result<Self> {
        config.validate()?;
        let registry = TaskRegistry::from_config(config)?;
        Ok(Self::new(config, registry))
    }

    pub fn with_insights<G: InsightGenerator + 'static>(mut self, insights: G) -> Self {
        self.insights = Arc::new(insights);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Register a run and launch its tools; returns without waiting for them.
    ///
    /// Only a malformed request is an error. Tool failures, unknown tool ids
    /// included, end up as error results inside the run.
    pub fn start_run(&self, request: RunRequest) -> Result<String, OrchestratorError> {
        let tool_ids = request.distinct_tool_ids()?;
        let run_id = Uuid::new_v4().to_string();

        let progress = tool_ids
            .iter()
            .map(|id| ToolProgress::pending(id.clone(), self.display_name(id)))
            .collect();

        let state = RunState {
            run_id: run_id.clone(),
            status: RunStatus::Running,
            progress,
            results: Vec::new(),
            summary: None,
            metadata: RunMetadata {
                address: request.address.clone(),
                started_at: Utc::now(),
                tool_ids: tool_ids.clone(),
            },
            completed_at: None,
            error: None,
        };

        let cancel = CancellationToken::new();
        let run = self.store.insert(state, cancel.clone());

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Run {} could not be scheduled: {}", run_id, e);
                run.finish(
                    RunStatus::Failed,
                    None,
                    Some(format!("failed to schedule tools: {}", e)),
                );
                return Ok(run_id);
            }
        };

        info!(
            "Starting run {} for {} with {} tools",
            run_id,
            request.address,
            tool_ids.len()
        );

        let address: Arc<str> = Arc::from(request.address.as_str());
        let options = Arc::new(request.options);

        let handles: Vec<(String, String, JoinHandle<ToolResult>)> = tool_ids
            .into_iter()
            .map(|tool_id| {
                let display_name = self.display_name(&tool_id);
                let unit = TaskUnit {
                    run: run.clone(),
                    run_id: run_id.clone(),
                    tool_id: tool_id.clone(),
                    display_name: display_name.clone(),
                    address: address.clone(),
                    options: options.clone(),
                    registry: self.registry.clone(),
                    insights: self.insights.clone(),
                    executor: self.executor.clone(),
                    semaphore: self.semaphore.clone(),
                    default_policy: self.retry.clone(),
                    cancel: cancel.child_token(),
                };
                (tool_id, display_name, runtime.spawn(execute_tool(unit)))
            })
            .collect();

        runtime.spawn(supervise(run, handles, self.scoring.clone()));

        Ok(run_id)
    }

    /// Deep copy of the run's current state
    pub fn get_run(&self, run_id: &str) -> Result<RunState, OrchestratorError> {
        self.store.snapshot(run_id)
    }

    pub fn get_progress(&self, run_id: &str) -> Result<Vec<ToolProgress>, OrchestratorError> {
        self.store.get_progress(run_id)
    }

    /// Signal cancellation to every unsettled tool in the run.
    ///
    /// Returns false when the run is unknown or already finished.
    pub fn cancel_run(&self, run_id: &str) -> bool {
        let Ok(run) = self.store.get(run_id) else {
            return false;
        };
        if run.status().is_terminal() {
            return false;
        }

        info!("Cancelling run {}", run_id);
        run.cancel_token().cancel();
        true
    }

    /// Wait until the run reaches a terminal state and return its final snapshot
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunState, OrchestratorError> {
        let run = self.store.get(run_id)?;
        let mut finished = run.subscribe();
        finished
            .wait_for(|done| *done)
            .await
            .map_err(|_| OrchestratorError::RunNotFound(run_id.to_string()))?;
        Ok(run.snapshot())
    }

    /// Evict runs that finished more than `max_age` ago
    pub fn cleanup_completed_runs(&self, max_age: Duration) -> usize {
        self.store.cleanup_completed(max_age)
    }

    /// Evict runs older than the retention window every `janitor_interval_sec`
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let retention = self.retention;
        let interval = self.janitor_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.cleanup_completed(retention);
            }
        })
    }

    fn display_name(&self, tool_id: &str) -> String {
        self.registry
            .display_name(tool_id)
            .unwrap_or(tool_id)
            .to_string()
    }
}

/// Wait for every task unit of a run, then summarize and complete it
async fn supervise(
    run: Arc<RunEntry>,
    handles: Vec<(String, String, JoinHandle<ToolResult>)>,
    scoring: ScoringConfig,
) {
    let mut futures: FuturesUnordered<_> = handles
        .into_iter()
        .map(|(tool_id, display_name, handle)| async move {
            (tool_id, display_name, handle.await)
        })
        .collect();

    while let Some((tool_id, display_name, joined)) = futures.next().await {
        match joined {
            Ok(result) if result.is_success() => {
                info!("Tool {} succeeded ({}ms)", tool_id, result.execution_time_ms);
            }
            Ok(result) => {
                info!(
                    "Tool {} settled with error: {}",
                    tool_id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            Err(e) => {
                warn!("Task for {} panicked: {}", tool_id, e);
                run.settle(ToolResult::failure(
                    tool_id,
                    display_name,
                    format!("task failed: {}", e),
                    Duration::ZERO,
                ));
            }
        }
    }

    let results = run.results();
    let summary = compute_summary(&results, &scoring);
    info!(
        "Run {} completed: {}/{} tools succeeded, score {}",
        run.run_id(),
        summary.successful_tools,
        summary.total_tools,
        summary.overall_score
    );
    run.finish(RunStatus::Completed, Some(summary), None);
}
