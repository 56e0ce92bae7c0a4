use crate::cli::{load_config, RunArgs};
use addrscan::output::{render_json, render_markdown, write_report, ReportFormat};
use addrscan::progress::ToolProgress;
use addrscan::runner::{Orchestrator, RunRequest, RunState};
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout_sec) = args.timeout_sec {
        config.timeout_sec = timeout_sec;
        for tool in &mut config.tools {
            tool.timeout_sec = Some(timeout_sec);
        }
    }

    let options: Value = match args.options.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("--options must be valid JSON")?,
        None => Value::Null,
    };

    let orchestrator = Orchestrator::from_config(&config)?;
    let tool_ids = args
        .tools
        .clone()
        .unwrap_or_else(|| orchestrator.registry().tool_ids().map(String::from).collect());

    let run_id =
        orchestrator.start_run(RunRequest::new(&args.address, tool_ids).with_options(options))?;
    info!("Started run {} for {}", run_id, args.address);

    let state = watch_run(&orchestrator, &run_id, Duration::from_millis(args.poll_ms)).await?;

    match &args.output {
        Some(path) => {
            write_report(path, &state, args.format)?;
            info!("Wrote report: {}", path.display());
        }
        None => match args.format {
            ReportFormat::Markdown => println!("{}", render_markdown(&state)),
            ReportFormat::Json => println!("{}", render_json(&state)?),
        },
    }

    if let Some(summary) = &state.summary {
        info!(
            "Completed: {}/{} tools succeeded, score {}",
            summary.successful_tools, summary.total_tools, summary.overall_score
        );

        if args.fail_on_error && summary.failed_tools > 0 {
            error!("Exiting with error: {} tools failed", summary.failed_tools);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Poll the run until it finishes, logging progress; Ctrl-C cancels it
async fn watch_run(
    orchestrator: &Orchestrator,
    run_id: &str,
    poll: Duration,
) -> anyhow::Result<RunState> {
    let mut ticker = interval(poll.max(Duration::from_millis(10)));
    let mut last: Vec<ToolProgress> = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                warn!("Interrupted, cancelling run {}", run_id);
                orchestrator.cancel_run(run_id);
                interrupted = true;
            }
            _ = ticker.tick() => {
                let state = orchestrator.get_run(run_id)?;
                for progress in &state.progress {
                    if !last.contains(progress) {
                        info!(
                            "[{}] {} {}%",
                            progress.display_name, progress.status, progress.percent
                        );
                    }
                }
                last = state.progress.clone();

                if state.status.is_terminal() {
                    return Ok(state);
                }
            }
        }
    }
}
