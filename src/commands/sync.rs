use super::local_tracker;
use crate::{
    libs::{messages::Message, sync::PushOutcome},
    msg_info,
};
use anyhow::Result;

pub async fn cmd() -> Result<()> {
    let mut tracker = local_tracker().await?;
    match tracker.push().await {
        PushOutcome::LoginRequired | PushOutcome::SessionExpired { .. } => return Ok(()),
        PushOutcome::Completed { sent, failed } => {
            tracing::info!(sent = sent.len(), failed = failed.len(), "push finished");
        }
        PushOutcome::Queued | PushOutcome::NothingToSend => {}
    }
    tracker.pull().await;

    if !tracker.queue().is_empty() {
        msg_info!(Message::QueuedDays(tracker.queue().len()));
    }
    msg_info!(Message::SyncFinished);
    Ok(())
}
