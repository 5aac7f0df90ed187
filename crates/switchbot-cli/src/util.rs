//! Utility functions for CLI operations.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::timeout;

use switchbot_core::{BleTransport, BotController, CompletionNotifier, LogSink};
use switchbot_types::{Command, ConnectionState, PeripheralIdentity};

use crate::config::ResolvedDevice;

/// Get device, with helpful error message.
pub fn require_device(device: Option<ResolvedDevice>) -> Result<ResolvedDevice> {
    device.ok_or_else(|| {
        anyhow::anyhow!(
            "No device specified. Use --device <ADDRESS> or set SWITCHBOT_DEVICE environment variable.\n\
             Save a default with an alias: 'switchbot alias set <name> <address>'."
        )
    })
}

/// Build a peripheral identity, rejecting malformed addresses.
pub fn identity_for(device: &ResolvedDevice) -> Result<PeripheralIdentity> {
    PeripheralIdentity::new(&device.address, device.display_name.clone())
        .with_context(|| format!("Invalid device address '{}'", device.address))
}

/// Run one command against a fresh controller and wait for its outcome.
///
/// Returns `Ok(false)` when the command failed or did not complete within
/// `wait`; `Err` only when no controller could be built.
pub async fn run_command(
    identity: PeripheralIdentity,
    command: Command,
    log: Arc<dyn LogSink>,
    wait: Duration,
) -> Result<bool> {
    let (transport, events) = BleTransport::new(identity.clone())
        .await
        .context("Bluetooth is not available")?;
    let name = identity.display_name().to_string();
    let (notifier, done) = CompletionNotifier::channel();
    let controller =
        BotController::new(identity, Arc::new(transport), events, log.clone(), notifier)?;

    log.append(&format!("{} requested for '{}'", command, name));
    controller.send(command)?;
    let success = match timeout(wait, done).await {
        Ok(outcome) => outcome.unwrap_or(false),
        Err(_) => {
            tracing::warn!("No outcome after {:?}", wait);
            false
        }
    };

    // Let the link teardown run before the controller goes away.
    let mut state = controller.watch_state();
    let _ = timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await;

    log.append(&format!(
        "{} finished for '{}'. success: {}",
        command, name, success
    ));
    Ok(success)
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(address: &str) -> ResolvedDevice {
        ResolvedDevice {
            address: address.to_string(),
            display_name: "kitchen".to_string(),
        }
    }

    #[test]
    fn test_require_device_with_some() {
        let result = require_device(Some(resolved("AA:BB:CC:DD:EE:FF")));
        assert_eq!(result.unwrap().address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_require_device_with_none() {
        let err = require_device(None).unwrap_err().to_string();
        assert!(err.contains("No device specified"));
        assert!(err.contains("SWITCHBOT_DEVICE"));
    }

    #[test]
    fn test_identity_for_normalizes_address() {
        let identity = identity_for(&resolved("aa-bb-cc-dd-ee-ff")).unwrap();
        assert_eq!(identity.address(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(identity.display_name(), "kitchen");
    }

    #[test]
    fn test_identity_for_rejects_garbage() {
        let err = identity_for(&resolved("not-an-address")).unwrap_err();
        assert!(err.to_string().contains("not-an-address"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_output(Some(&path), "{}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }
}
