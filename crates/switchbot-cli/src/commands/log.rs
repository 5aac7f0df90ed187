//! Status log viewer.

use std::path::PathBuf;

use anyhow::{Context, Result};

use switchbot_core::FileLog;

use crate::util::write_output;

pub fn cmd_log(log: &FileLog, lines: usize, output: Option<&PathBuf>, quiet: bool) -> Result<()> {
    let entries = if lines == 0 {
        log.read_lines()
    } else {
        log.tail(lines)
    }
    .with_context(|| format!("Failed to read {}", log.path().display()))?;

    if entries.is_empty() {
        if !quiet {
            eprintln!("No log entries in {}", log.path().display());
        }
        return Ok(());
    }

    let mut content = entries.join("\n");
    content.push('\n');
    write_output(output, &content)
}
