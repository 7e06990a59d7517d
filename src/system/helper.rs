//! Bounded execution of external sensor helpers (`sensors`, `hddtemp`).

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Runs `command` and returns its stdout.
///
/// The child is killed when it outlives `timeout`. Spawn failures, timeouts
/// and non-zero exits are all precondition failures: without the helper the
/// monitor has nothing to show.
pub async fn run_helper(command: &[String], timeout: Duration) -> Result<String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::precondition("empty helper command"))?;

    debug!("Running helper: {:?}", command);
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::precondition(format!("failed to start {program}: {e}")))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            Error::precondition(format!(
                "{program} did not finish within {}s",
                timeout.as_secs_f32()
            ))
        })?
        .map_err(|e| Error::precondition(format!("failed to read from {program}: {e}")))?;

    if !output.status.success() {
        return Err(Error::precondition(format!(
            "{program} exited with {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
