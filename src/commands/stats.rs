use super::local_tracker;
use crate::{
    libs::{
        dwell::usage_from_tabs,
        formatter::{day_table, format_seconds, queue_table},
        messages::Message,
    },
    msg_info, msg_print,
};
use anyhow::Result;
use clap::Args;
use serde_json::json;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Print the counters as JSON instead of a table
    #[arg(long)]
    json: bool,
    /// Also list the days waiting in the offline queue
    #[arg(short, long)]
    queue: bool,
}

pub async fn cmd(args: StatsArgs) -> Result<()> {
    let tracker = local_tracker().await?;
    let day = tracker.day().clone();

    if args.json {
        let stats = json!({
            "date": day.date,
            "totalTime": day.total_seconds,
            "tabUsage": usage_from_tabs(&day.tabs),
            "isTracking": tracker.focus().is_tracking(),
            "queuedDays": tracker.queue().len(),
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    msg_print!(Message::StatsHeader(day.date.to_string()), true);
    if day.is_empty() {
        msg_info!(Message::NoStatsForToday);
    } else {
        day_table(&day).printstd();
        msg_print!(Message::StatsTotal(format_seconds(day.total_seconds)));
    }

    if !tracker.queue().is_empty() {
        msg_info!(Message::QueuedDays(tracker.queue().len()));
        if args.queue {
            queue_table(tracker.queue()).printstd();
        }
    }
    Ok(())
}
