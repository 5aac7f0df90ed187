//! Example: Pressing a Bot
//!
//! Connects to a SwitchBot Bot, sends one command and waits for the
//! outcome. Status lines are written to the default log file.
//!
//! Run with: `cargo run --example press -- <DEVICE_ADDRESS> [press|on|off]`

use std::env;
use std::sync::Arc;

use switchbot_core::{BleTransport, BotController, CompletionNotifier, FileLog};
use switchbot_types::{Command, PeripheralIdentity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let address = if args.len() > 1 {
        &args[1]
    } else {
        eprintln!("Usage: {} <DEVICE_ADDRESS> [press|on|off]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} AA:BB:CC:DD:EE:FF on", args[0]);
        std::process::exit(1);
    };
    let command: Command = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(Command::Press);

    let identity = PeripheralIdentity::from_address(address)?;
    let (transport, events) = BleTransport::new(identity.clone()).await?;
    let log = Arc::new(FileLog::open_default());
    let (notifier, done) = CompletionNotifier::channel();

    let controller = BotController::new(
        identity,
        Arc::new(transport),
        events,
        log.clone(),
        notifier,
    )?;

    println!("Sending '{}' to {}...", command, address);
    controller.send(command)?;

    let success = done.await.unwrap_or(false);
    println!("{}", if success { "Done." } else { "Failed." });
    println!("Log: {}", log.path().display());

    Ok(())
}
