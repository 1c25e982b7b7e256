//! Duration formatting and table rendering for the `stats` command.
//!
//! Durations are shown as "HH:MM:SS"; hours are not wrapped at 24.
//!
//! ```rust
//! use dwellsync::libs::formatter::format_seconds;
//!
//! assert_eq!(format_seconds(65), "00:01:05");
//! assert_eq!(format_seconds(3 * 3600 + 4), "03:00:04");
//! ```

use super::dwell::TrackingDay;
use super::queue::OfflineQueue;
use prettytable::{row, Table};

pub fn format_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Per-host rows, longest dwell first. Ties keep hostname order.
pub fn day_table(day: &TrackingDay) -> Table {
    let mut hosts: Vec<(&String, &u64)> = day.tabs.iter().collect();
    hosts.sort_by(|a, b| b.1.cmp(a.1));

    let mut table = Table::new();
    table.add_row(row!["WEBSITE", "TIME", "SHARE"]);
    for (hostname, seconds) in hosts {
        table.add_row(row![hostname, format_seconds(*seconds), share(*seconds, day.total_seconds)]);
    }
    table
}

pub fn queue_table(queue: &OfflineQueue) -> Table {
    let mut table = Table::new();
    table.add_row(row!["DATE", "TIME", "WEBSITES"]);
    for snapshot in queue.iter() {
        table.add_row(row![snapshot.date, format_seconds(snapshot.total_seconds), snapshot.tabs.len()]);
    }
    table
}

fn share(part: u64, total: u64) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}
