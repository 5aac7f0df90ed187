//! Periodic command runner.
//!
//! Each tick builds a fresh controller, runs one command and waits for its
//! outcome before the next tick is considered, so runs never overlap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use switchbot_core::LogSink;
use switchbot_types::Command;

use crate::config::ResolvedDevice;
use crate::util::{identity_for, run_command};

/// Arguments for the schedule command.
pub struct ScheduleArgs {
    pub device: ResolvedDevice,
    pub command: Command,
    pub every: Duration,
    /// Number of runs, 0 for unlimited
    pub count: u32,
    pub timeout: Duration,
    pub quiet: bool,
}

/// Tally of scheduled runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub runs: u32,
    pub failures: u32,
}

impl ScheduleSummary {
    fn record(&mut self, success: bool) {
        self.runs += 1;
        if !success {
            self.failures += 1;
        }
    }

    fn is_done(&self, count: u32) -> bool {
        count != 0 && self.runs >= count
    }
}

pub async fn cmd_schedule(args: ScheduleArgs, log: Arc<dyn LogSink>) -> Result<()> {
    let identity = identity_for(&args.device)?;
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    if !args.quiet {
        eprintln!(
            "Running '{}' on {} every {}s (Ctrl+C to stop)",
            args.command,
            identity,
            args.every.as_secs()
        );
    }

    let mut ticker = interval(args.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = ScheduleSummary::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Schedule stopped");
                break;
            }
            _ = ticker.tick() => {}
        }

        let success =
            match run_command(identity.clone(), args.command, log.clone(), args.timeout).await {
                Ok(success) => success,
                Err(e) => {
                    warn!("Scheduled run failed to start: {:#}", e);
                    log.append(&format!("scheduled '{}' could not start: {}", args.command, e));
                    false
                }
            };
        summary.record(success);
        info!(
            run = summary.runs,
            success, "Scheduled '{}' on '{}'", args.command, identity.display_name()
        );
        if !args.quiet {
            println!(
                "run {}: {}",
                summary.runs,
                if success { "done" } else { "FAILED" }
            );
        }

        if summary.is_done(args.count) {
            break;
        }
    }

    if !args.quiet {
        eprintln!("{} runs, {} failed", summary.runs, summary.failures);
    }
    Ok(())
}
