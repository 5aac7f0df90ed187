//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use switchbot_types::Command;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Bot action, as accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Press and release
    #[default]
    Press,
    /// Switch on
    On,
    /// Switch off
    Off,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Press => Command::Press,
            Action::On => Command::TurnOn,
            Action::Off => Command::TurnOff,
        }
    }
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device address or alias, or use SWITCHBOT_DEVICE env var
    #[arg(short, long, env = "SWITCHBOT_DEVICE")]
    pub device: Option<String>,

    /// Seconds to wait for the command to complete
    #[arg(short = 'T', long, default_value = "30")]
    pub timeout: u64,
}

#[derive(Parser)]
#[command(name = "switchbot")]
#[command(author, version, about = "CLI for SwitchBot Bot actuators", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Status log file (defaults to the config value, then the data directory)
    #[arg(long, global = true, env = "SWITCHBOT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Press the Bot's button
    Press {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Switch the Bot on
    On {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Switch the Bot off
    Off {
        #[command(flatten)]
        device: DeviceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a command periodically
    Schedule {
        #[command(flatten)]
        device: DeviceArgs,

        /// Interval between runs in seconds
        #[arg(short, long, default_value = "3600", value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,

        /// Number of runs before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Action to run on each tick
        #[arg(short, long, value_enum, default_value = "press")]
        command: Action,
    },

    /// Show the status log
    Log {
        /// Number of lines to show (0 for all)
        #[arg(short = 'n', long, default_value = "20")]
        lines: usize,
    },

    /// Manage device aliases (friendly names)
    Alias {
        #[command(subcommand)]
        action: AliasSubcommand,
    },
}

/// Alias subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum AliasSubcommand {
    /// List all device aliases
    List,

    /// Set a device alias
    Set {
        /// Friendly name for the device (e.g., "kitchen", "coffee-maker")
        name: String,

        /// Device address (MAC address or UUID)
        address: String,
    },

    /// Remove a device alias
    #[command(alias = "rm")]
    Remove {
        /// Alias name to remove
        name: String,
    },
}
