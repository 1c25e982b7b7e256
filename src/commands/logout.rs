use super::local_tracker;
use anyhow::Result;

/// Clears credentials and all tracked data. The engine reports the outcome.
pub async fn cmd() -> Result<()> {
    local_tracker().await?.logout();
    Ok(())
}
