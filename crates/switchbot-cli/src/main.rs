//! Command-line interface for SwitchBot Bot actuators.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `press` | Press the button once |
//! | `on` / `off` | Switch-mode commands |
//! | `schedule` | Run a command periodically |
//! | `log` | Show the status log |
//! | `alias` | Manage device nicknames |
//!
//! Settings live in `<config dir>/switchbot/config.toml`.

mod cli;
mod commands;
mod config;
mod util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use switchbot_core::FileLog;
use switchbot_types::Command;

use cli::{AliasSubcommand, Cli, Commands, DeviceArgs, OutputFormat};
use commands::{AliasAction, ScheduleArgs, SendArgs, cmd_alias, cmd_log, cmd_schedule, cmd_send};
use config::{Config, resolve_device, resolve_log_file, resolve_timeout};
use util::require_device;

/// clap's default for `--timeout`.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let log = Arc::new(FileLog::new(resolve_log_file(
        cli.log_file.as_deref(),
        &config,
    )));

    let Cli {
        quiet,
        output,
        command,
        ..
    } = cli;

    match command {
        Commands::Press { device, format } => {
            send(&config, log, device, Command::Press, format, output, quiet).await
        }
        Commands::On { device, format } => {
            send(&config, log, device, Command::TurnOn, format, output, quiet).await
        }
        Commands::Off { device, format } => {
            send(&config, log, device, Command::TurnOff, format, output, quiet).await
        }
        Commands::Schedule {
            device,
            every,
            count,
            command,
        } => {
            let resolved = require_device(resolve_device(device.device.as_deref(), &config))?;
            let timeout = resolve_timeout(device.timeout, &config, DEFAULT_TIMEOUT_SECS);
            let args = ScheduleArgs {
                device: resolved,
                command: command.into(),
                every: Duration::from_secs(every),
                count,
                timeout: Duration::from_secs(timeout),
                quiet,
            };
            cmd_schedule(args, log).await
        }
        Commands::Log { lines } => cmd_log(&log, lines, output.as_ref(), quiet),
        Commands::Alias { action } => {
            let action = match action {
                AliasSubcommand::List => AliasAction::List,
                AliasSubcommand::Set { name, address } => AliasAction::Set { name, address },
                AliasSubcommand::Remove { name } => AliasAction::Remove { name },
            };
            cmd_alias(action, &Config::path(), quiet)
        }
    }
}

async fn send(
    config: &Config,
    log: Arc<FileLog>,
    device: DeviceArgs,
    command: Command,
    format: OutputFormat,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let resolved = require_device(resolve_device(device.device.as_deref(), config))?;
    let timeout = resolve_timeout(device.timeout, config, DEFAULT_TIMEOUT_SECS);
    let args = SendArgs {
        device: resolved,
        command,
        timeout: Duration::from_secs(timeout),
        format,
        output,
        quiet,
    };
    cmd_send(args, log).await
}
