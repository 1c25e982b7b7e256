//! Offline queue of absolute daily snapshots awaiting remote confirmation.

use super::dwell::{tabs_from_usage, usage_from_tabs, TrackingDay, DAILY_CAP_SECS};
use crate::api::DayRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Best-known absolute state of one day that the remote store has not confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedSnapshot {
    pub date: NaiveDate,
    pub total_seconds: u64,
    pub tabs: BTreeMap<String, u64>,
}

impl QueuedSnapshot {
    pub fn of_day(day: &TrackingDay) -> Self {
        Self {
            date: day.date,
            total_seconds: day.total_seconds,
            tabs: day.tabs.clone(),
        }
    }

    /// Nothing worth sending: no total and no non-zero tab.
    pub fn is_empty(&self) -> bool {
        self.total_seconds == 0 && self.tabs.values().all(|secs| *secs == 0)
    }

    /// Per-hostname and total max of `self` and `other`; counts never go down.
    ///
    /// Hosts can peak in different inputs, so the total is raised to the
    /// merged tab sum (within the daily cap).
    pub fn max_merge(&self, other: &QueuedSnapshot) -> QueuedSnapshot {
        let mut tabs = self.tabs.clone();
        for (host, secs) in &other.tabs {
            let entry = tabs.entry(host.clone()).or_insert(0);
            *entry = (*entry).max(*secs);
        }
        let tab_sum: u64 = tabs.values().sum();
        QueuedSnapshot {
            date: self.date,
            total_seconds: self.total_seconds.max(other.total_seconds).max(tab_sum).min(DAILY_CAP_SECS),
            tabs,
        }
    }
}

impl From<&QueuedSnapshot> for DayRecord {
    fn from(snapshot: &QueuedSnapshot) -> Self {
        Self {
            date: snapshot.date,
            total_time: snapshot.total_seconds,
            tabs: usage_from_tabs(&snapshot.tabs),
        }
    }
}

impl From<DayRecord> for QueuedSnapshot {
    fn from(record: DayRecord) -> Self {
        Self {
            date: record.date,
            total_seconds: record.total_time,
            tabs: tabs_from_usage(&record.tabs),
        }
    }
}

/// At most one snapshot per date, kept in date order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineQueue {
    entries: BTreeMap<NaiveDate, QueuedSnapshot>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a queue from stored records. Later duplicates win.
    pub fn from_records(records: Vec<DayRecord>) -> Self {
        let mut queue = Self::new();
        for record in records {
            queue.upsert(record.into());
        }
        queue
    }

    pub fn to_records(&self) -> Vec<DayRecord> {
        self.entries.values().map(DayRecord::from).collect()
    }

    /// Inserts or replaces the snapshot for its date (last write wins).
    pub fn upsert(&mut self, snapshot: QueuedSnapshot) {
        self.entries.insert(snapshot.date, snapshot);
    }

    /// Drops the snapshots for dates the remote store confirmed.
    pub fn drain<'a>(&mut self, dates: impl IntoIterator<Item = &'a NaiveDate>) {
        for date in dates {
            self.entries.remove(date);
        }
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&QueuedSnapshot> {
        self.entries.get(date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedSnapshot> {
        self.entries.values()
    }

    /// The live day as a push should send it.
    ///
    /// Max-merged with the queued entry for the same date and with the day's
    /// last synced values, so a push never sends a count lower than one
    /// already sent or queued.
    pub fn live_snapshot(&self, current: &TrackingDay) -> QueuedSnapshot {
        let previously_sent = QueuedSnapshot {
            date: current.date,
            total_seconds: current.last_synced_total_seconds,
            tabs: current.last_synced_tabs.clone(),
        };
        let live = QueuedSnapshot::of_day(current).max_merge(&previously_sent);
        match self.entries.get(&current.date) {
            Some(queued) => live.max_merge(queued),
            None => live,
        }
    }

    /// Every snapshot a push should attempt, in date order.
    ///
    /// The live day (see [`live_snapshot`](Self::live_snapshot)) wins over a
    /// queued entry for the same date. Empty snapshots are left out.
    pub fn materialize(&self, current: &TrackingDay) -> Vec<QueuedSnapshot> {
        let mut candidates = self.entries.clone();
        candidates.insert(current.date, self.live_snapshot(current));
        candidates.into_values().filter(|snapshot| !snapshot.is_empty()).collect()
    }
}
