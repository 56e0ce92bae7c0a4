//! Concurrent multi-tool address analysis.
//!
//! An [`Orchestrator`](runner::Orchestrator) takes a [`RunRequest`](runner::RunRequest)
//! naming one address and a set of tools, runs every tool concurrently with
//! bounded, jittered retries and cancellation, tracks per-tool progress, and
//! folds the outcomes into a scored [`Summary`](runner::Summary).

pub mod config;
pub mod error;
pub mod insights;
pub mod output;
pub mod progress;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod store;
