//! One-shot press / on / off.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Serialize;

use switchbot_core::LogSink;
use switchbot_types::Command;

use crate::cli::OutputFormat;
use crate::config::ResolvedDevice;
use crate::util::{identity_for, run_command, write_output};

/// Arguments for a one-shot command.
pub struct SendArgs {
    pub device: ResolvedDevice,
    pub command: Command,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

/// Outcome of a one-shot command, as printed in JSON mode.
#[derive(Debug, Serialize)]
pub struct CommandOutcome {
    pub device: String,
    pub name: String,
    pub command: Command,
    pub success: bool,
}

pub async fn cmd_send(args: SendArgs, log: Arc<dyn LogSink>) -> Result<()> {
    let identity = identity_for(&args.device)?;
    if !args.quiet {
        eprintln!("Sending '{}' to {}...", args.command, identity);
    }

    let success = run_command(identity.clone(), args.command, log, args.timeout).await?;
    let outcome = CommandOutcome {
        device: identity.address().to_string(),
        name: identity.display_name().to_string(),
        command: args.command,
        success,
    };

    let content = format_outcome(&outcome, args.format)?;
    if args.format == OutputFormat::Json || !args.quiet || !success {
        write_output(args.output.as_ref(), &content)?;
    }

    if !success {
        bail!("'{}' on {} failed", args.command, identity);
    }
    Ok(())
}

fn format_outcome(outcome: &CommandOutcome, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => {
            let status = if outcome.success { "done" } else { "FAILED" };
            format!("{} {}: {}\n", outcome.name, outcome.command, status)
        }
    })
}
