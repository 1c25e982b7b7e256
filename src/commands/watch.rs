use crate::libs::daemon;
use anyhow::Result;

/// Runs the native messaging host in the foreground.
///
/// The browser starts this process and owns its stdin/stdout; it exits when
/// the browser closes the port or on SIGINT/SIGTERM.
pub async fn cmd() -> Result<()> {
    daemon::run_with_signal_handling().await
}
