//! In-memory arena of runs keyed by run id.
//!
//! Each run sits behind its own mutex; sibling task units update progress and
//! append results through it and readers take cloned snapshots under the same
//! lock. Finished runs stay until `cleanup_completed` evicts them.

use crate::error::OrchestratorError;
use crate::progress::{ToolProgress, ToolStatus};
use crate::runner::{RunState, RunStatus, Summary, ToolResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct RunSlot {
    state: RunState,
    finished_at: Option<Instant>,
}

pub struct RunEntry {
    slot: Mutex<RunSlot>,
    cancel: CancellationToken,
    finished: watch::Sender<bool>,
}

impl RunEntry {
    fn new(state: RunState, cancel: CancellationToken) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            slot: Mutex::new(RunSlot {
                state,
                finished_at: None,
            }),
            cancel,
            finished,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_id(&self) -> String {
        self.lock().state.run_id.clone()
    }

    pub fn snapshot(&self) -> RunState {
        self.lock().state.clone()
    }

    pub fn progress(&self) -> Vec<ToolProgress> {
        self.lock().state.progress.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.lock().state.status
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Apply a progress update for one tool; invalid transitions are ignored
    pub fn set_status(
        &self,
        tool_id: &str,
        status: ToolStatus,
        percent: u8,
        error: Option<String>,
    ) -> bool {
        let mut slot = self.lock();
        let Some(progress) = slot
            .state
            .progress
            .iter_mut()
            .find(|p| p.tool_id == tool_id)
        else {
            debug!("Progress update for unknown tool {}", tool_id);
            return false;
        };

        let applied = progress.apply(status, percent, error);
        if applied {
            debug!("{} -> {} ({}%)", tool_id, progress.status, progress.percent);
        }
        applied
    }

    /// Record a tool's terminal progress and its result in one step.
    ///
    /// A tool settles at most once; later calls for the same tool are ignored.
    pub fn settle(&self, result: ToolResult) -> bool {
        let mut slot = self.lock();
        if slot.state.results.iter().any(|r| r.tool_id == result.tool_id) {
            debug!("Ignoring duplicate result for {}", result.tool_id);
            return false;
        }

        if let Some(progress) = slot
            .state
            .progress
            .iter_mut()
            .find(|p| p.tool_id == result.tool_id)
        {
            if result.is_success() {
                progress.apply(ToolStatus::Completed, 100, None);
            } else {
                progress.apply(ToolStatus::Error, 0, result.error.clone());
            }
        }

        slot.state.results.push(result);
        true
    }

    pub fn results(&self) -> Vec<ToolResult> {
        self.lock().state.results.clone()
    }

    /// Move the run to a terminal status and wake anyone waiting on it
    pub fn finish(&self, status: RunStatus, summary: Option<Summary>, error: Option<String>) {
        {
            let mut slot = self.lock();
            if slot.state.status.is_terminal() {
                return;
            }
            slot.state.status = status;
            slot.state.summary = summary;
            slot.state.error = error;
            slot.state.completed_at = Some(Utc::now());
            slot.finished_at = Some(Instant::now());
        }
        self.finished.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.finished.subscribe()
    }

    fn finished_before(&self, cutoff: Instant) -> bool {
        self.lock()
            .finished_at
            .map(|at| at <= cutoff)
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct RunStore {
    runs: RwLock<HashMap<String, Arc<RunEntry>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state: RunState, cancel: CancellationToken) -> Arc<RunEntry> {
        let run_id = state.run_id.clone();
        let entry = Arc::new(RunEntry::new(state, cancel));
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id, entry.clone());
        entry
    }

    pub fn get(&self, run_id: &str) -> Result<Arc<RunEntry>, OrchestratorError> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::RunNotFound(run_id.to_string()))
    }

    pub fn snapshot(&self, run_id: &str) -> Result<RunState, OrchestratorError> {
        Ok(self.get(run_id)?.snapshot())
    }

    pub fn set_status(
        &self,
        run_id: &str,
        tool_id: &str,
        status: ToolStatus,
        percent: u8,
        error: Option<String>,
    ) -> Result<bool, OrchestratorError> {
        Ok(self.get(run_id)?.set_status(tool_id, status, percent, error))
    }

    pub fn get_progress(&self, run_id: &str) -> Result<Vec<ToolProgress>, OrchestratorError> {
        Ok(self.get(run_id)?.progress())
    }

    /// Evict runs that reached a terminal state more than `max_age` ago
    pub fn cleanup_completed(&self, max_age: Duration) -> usize {
        let Some(cutoff) = Instant::now().checked_sub(max_age) else {
            return 0;
        };

        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let before = runs.len();
        runs.retain(|_, entry| !entry.finished_before(cutoff));
        let removed = before - runs.len();

        if removed > 0 {
            info!("Evicted {} finished runs", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunMetadata;
    use serde_json::json;

    fn running_state(run_id: &str, tools: &[&str]) -> RunState {
        RunState {
            run_id: run_id.to_string(),
            status: RunStatus::Running,
            progress: tools.iter().map(|t| ToolProgress::pending(*t, *t)).collect(),
            results: Vec::new(),
            summary: None,
            metadata: RunMetadata {
                address: "0xabc".to_string(),
                started_at: Utc::now(),
                tool_ids: tools.iter().map(|t| t.to_string()).collect(),
            },
            completed_at: None,
            error: None,
        }
    }

    #[test]
    fn test_missing_run() {
        let store = RunStore::new();
        assert!(matches!(
            store.snapshot("nope"),
            Err(OrchestratorError::RunNotFound(_))
        ));
        assert!(store
            .set_status("nope", "a", ToolStatus::Running, 10, None)
            .is_err());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = RunStore::new();
        store.insert(running_state("r1", &["a"]), CancellationToken::new());

        let before = store.snapshot("r1").unwrap();
        store
            .set_status("r1", "a", ToolStatus::Running, 10, None)
            .unwrap();

        assert_eq!(before.progress[0].status, ToolStatus::Pending);
        assert_eq!(
            store.get_progress("r1").unwrap()[0].status,
            ToolStatus::Running
        );
    }

    #[test]
    fn test_settle_once_per_tool() {
        let store = RunStore::new();
        let entry = store.insert(running_state("r1", &["a"]), CancellationToken::new());
        entry.set_status("a", ToolStatus::Running, 10, None);

        assert!(entry.settle(ToolResult::success(
            "a",
            "a",
            json!({}),
            Default::default(),
            Duration::from_millis(5),
        )));
        assert!(!entry.settle(ToolResult::failure("a", "a", "late", Duration::ZERO)));

        let state = entry.snapshot();
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.progress[0].status, ToolStatus::Completed);
        assert_eq!(state.progress[0].percent, 100);
    }

    #[test]
    fn test_cleanup_only_evicts_finished_runs() {
        let store = RunStore::new();
        let done = store.insert(running_state("done", &["a"]), CancellationToken::new());
        store.insert(running_state("active", &["a"]), CancellationToken::new());

        done.finish(RunStatus::Completed, None, None);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.cleanup_completed(Duration::from_secs(60)), 0);
        assert_eq!(store.cleanup_completed(Duration::from_millis(10)), 1);
        assert!(store.get("done").is_err());
        assert!(store.get("active").is_ok());
    }

    #[test]
    fn test_finish_is_terminal() {
        let store = RunStore::new();
        let entry = store.insert(running_state("r1", &["a"]), CancellationToken::new());
        let rx = entry.subscribe();

        entry.finish(RunStatus::Completed, None, None);
        entry.finish(RunStatus::Failed, None, Some("late".to_string()));

        assert!(*rx.borrow());
        let state = entry.snapshot();
        assert_eq!(state.status, RunStatus::Completed);
        assert!(state.error.is_none());
        assert!(state.completed_at.is_some());
    }
}
