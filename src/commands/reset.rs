use super::local_tracker;
use crate::{libs::messages::Message, msg_success};
use anyhow::Result;

pub async fn cmd() -> Result<()> {
    let mut tracker = local_tracker().await?;
    tracker.reset();
    msg_success!(Message::DataReset);
    Ok(())
}
