//! Dwell time accumulation.
//!
//! [`TrackingDay`] is the per-day record: total seconds plus a bucket per
//! hostname. [`DwellAccumulator`] turns wall-clock time into whole seconds on
//! each tick, keeping the fractional remainder for the next one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seconds in a day; no day may hold more tracked time than this.
pub const DAILY_CAP_SECS: u64 = 86_400;

/// One hostname's share of a day, as stored locally and sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUsage {
    pub url: String,
    pub time_spent: u64,
}

/// Per-hostname seconds, summing duplicate hostnames.
pub fn tabs_from_usage(usage: &[TabUsage]) -> BTreeMap<String, u64> {
    let mut tabs = BTreeMap::new();
    for entry in usage {
        *tabs.entry(entry.url.clone()).or_insert(0) += entry.time_spent;
    }
    tabs
}

pub fn usage_from_tabs(tabs: &BTreeMap<String, u64>) -> Vec<TabUsage> {
    tabs.iter()
        .map(|(url, secs)| TabUsage {
            url: url.clone(),
            time_spent: *secs,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingDay {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub tabs: BTreeMap<String, u64>,
    /// Last total the remote store accepted for this day.
    pub last_synced_total_seconds: u64,
    pub last_synced_tabs: BTreeMap<String, u64>,
}

impl TrackingDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_seconds: 0,
            tabs: BTreeMap::new(),
            last_synced_total_seconds: 0,
            last_synced_tabs: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_seconds == 0 && self.tabs.values().all(|secs| *secs == 0)
    }

    pub fn tabs_sum(&self) -> u64 {
        self.tabs.values().sum()
    }

    /// Seconds not yet accepted by the remote store.
    pub fn unsynced_seconds(&self) -> u64 {
        self.total_seconds.saturating_sub(self.last_synced_total_seconds)
    }

    /// Overwrites local counters with the remote record for this day.
    ///
    /// The total is raised to the tab sum and clamped to `cap`, so a remote
    /// record can never break the day invariants.
    pub fn replace_from_remote(&mut self, total_seconds: u64, tabs: BTreeMap<String, u64>, cap: u64) {
        let tab_sum: u64 = tabs.values().sum();
        self.total_seconds = total_seconds.max(tab_sum).min(cap);
        self.tabs = tabs;
        self.last_synced_total_seconds = self.total_seconds;
        self.last_synced_tabs = self.tabs.clone();
    }

    /// Records that the remote store accepted `total_seconds`/`tabs` for this day.
    pub fn mark_synced(&mut self, total_seconds: u64, tabs: &BTreeMap<String, u64>) {
        self.last_synced_total_seconds = total_seconds;
        self.last_synced_tabs = tabs.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Less than a whole second has passed; nothing recorded, checkpoint kept.
    Absorbed,
    /// Whole seconds were added to the day and the hostname bucket.
    Added(u64),
    /// The day hit the cap. Carries the seconds that still fit under it.
    Capped(u64),
    /// No checkpoint is set, so there is nothing to measure from.
    NotRunning,
}

impl TickOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, TickOutcome::Added(_) | TickOutcome::Capped(_))
    }
}

/// Converts elapsed wall-clock time into whole tracked seconds.
#[derive(Debug, Clone)]
pub struct DwellAccumulator {
    checkpoint: Option<DateTime<Utc>>,
    cap: u64,
}

impl Default for DwellAccumulator {
    fn default() -> Self {
        Self::new(DAILY_CAP_SECS)
    }
}

impl DwellAccumulator {
    pub fn new(cap: u64) -> Self {
        Self { checkpoint: None, cap }
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
        self.checkpoint
    }

    /// Starts measuring from `now`, discarding any partial second.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.checkpoint = Some(now);
    }

    pub fn stop(&mut self) {
        self.checkpoint = None;
    }

    pub fn is_running(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Books the whole seconds between the checkpoint and `now` against `hostname`.
    ///
    /// The checkpoint advances by exactly the seconds booked, so sub-second
    /// remainders carry over instead of being counted twice or lost. When the
    /// day would exceed the cap, the total is clamped, the checkpoint stops and
    /// [`TickOutcome::Capped`] tells the caller to leave the tracking state.
    pub fn accumulate(&mut self, day: &mut TrackingDay, hostname: &str, now: DateTime<Utc>) -> TickOutcome {
        let Some(checkpoint) = self.checkpoint else {
            return TickOutcome::NotRunning;
        };
        let elapsed = (now - checkpoint).num_seconds();
        if elapsed < 1 {
            return TickOutcome::Absorbed;
        }
        let elapsed = elapsed as u64;

        if day.total_seconds + elapsed > self.cap {
            let fits = self.cap.saturating_sub(day.total_seconds);
            if fits > 0 {
                *day.tabs.entry(hostname.to_string()).or_insert(0) += fits;
            }
            day.total_seconds = self.cap;
            self.checkpoint = None;
            return TickOutcome::Capped(fits);
        }

        day.total_seconds += elapsed;
        *day.tabs.entry(hostname.to_string()).or_insert(0) += elapsed;
        self.checkpoint = Some(checkpoint + chrono::Duration::seconds(elapsed as i64));
        TickOutcome::Added(elapsed)
    }
}
