#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use dwellsync::api::DayRecord;
    use dwellsync::libs::dwell::{TabUsage, TrackingDay, DAILY_CAP_SECS};
    use dwellsync::libs::queue::{OfflineQueue, QueuedSnapshot};
    use std::collections::BTreeMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn snapshot(d: u32, total: u64, tabs: &[(&str, u64)]) -> QueuedSnapshot {
        QueuedSnapshot {
            date: date(d),
            total_seconds: total,
            tabs: tabs.iter().map(|(h, s)| (h.to_string(), *s)).collect(),
        }
    }

    #[test]
    fn test_upsert_keeps_one_entry_per_date() {
        let mut queue = OfflineQueue::new();
        queue.upsert(snapshot(25, 100, &[("a.com", 100)]));
        queue.upsert(snapshot(25, 150, &[("a.com", 150)]));
        queue.upsert(snapshot(24, 10, &[("b.com", 10)]));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(&date(25)).map(|s| s.total_seconds), Some(150));
        let dates: Vec<NaiveDate> = queue.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date(24), date(25)]);
    }

    #[test]
    fn test_drain_removes_only_confirmed_dates() {
        let mut queue = OfflineQueue::new();
        queue.upsert(snapshot(23, 1, &[]));
        queue.upsert(snapshot(24, 2, &[]));
        queue.upsert(snapshot(25, 3, &[]));

        queue.drain([&date(23), &date(25)]);

        assert_eq!(queue.len(), 1);
        assert!(queue.get(&date(24)).is_some());
    }

    #[test]
    fn test_max_merge_never_lowers_a_count() {
        let local = snapshot(25, 300, &[("a.com", 200), ("b.com", 100)]);
        let queued = snapshot(25, 250, &[("a.com", 250)]);

        let merged = local.max_merge(&queued);

        assert_eq!(merged.total_seconds, 300);
        assert_eq!(merged.tabs.get("a.com"), Some(&250));
        assert_eq!(merged.tabs.get("b.com"), Some(&100));
    }

    #[test]
    fn test_materialize_prefers_live_day_and_skips_empty() {
        let mut queue = OfflineQueue::new();
        queue.upsert(snapshot(24, 0, &[]));
        queue.upsert(snapshot(23, 40, &[("a.com", 40)]));
        queue.upsert(snapshot(25, 50, &[("a.com", 50)]));

        let mut live = TrackingDay::new(date(25));
        live.total_seconds = 80;
        live.tabs.insert("a.com".to_string(), 30);
        live.tabs.insert("c.com".to_string(), 50);

        let candidates = queue.materialize(&live);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].date, date(23));
        let today = &candidates[1];
        assert_eq!(today.total_seconds, 100);
        assert_eq!(today.tabs.get("a.com"), Some(&50));
        assert_eq!(today.tabs.get("c.com"), Some(&50));
    }

    #[test]
    fn test_merged_total_covers_tab_sum_after_remote_replace() {
        let mut queue = OfflineQueue::new();
        queue.upsert(snapshot(25, 100, &[("a.com", 100)]));

        let mut live = TrackingDay::new(date(25));
        let remote = BTreeMap::from([("a.com".to_string(), 20), ("b.com".to_string(), 50)]);
        live.replace_from_remote(70, remote, DAILY_CAP_SECS);

        let candidates = queue.materialize(&live);

        assert_eq!(candidates.len(), 1);
        let today = &candidates[0];
        assert_eq!(today.tabs.get("a.com"), Some(&100));
        assert_eq!(today.tabs.get("b.com"), Some(&50));
        assert_eq!(today.total_seconds, 150);
        assert!(today.tabs.values().sum::<u64>() <= today.total_seconds);
    }

    #[test]
    fn test_merged_total_stays_within_daily_cap() {
        let local = snapshot(25, 80_000, &[("a.com", 80_000)]);
        let queued = snapshot(25, 60_000, &[("b.com", 60_000)]);

        assert_eq!(local.max_merge(&queued).total_seconds, DAILY_CAP_SECS);
    }

    #[test]
    fn test_live_snapshot_includes_last_synced_values() {
        let queue = OfflineQueue::new();
        let mut live = TrackingDay::new(date(25));
        live.mark_synced(600, &BTreeMap::from([("a.com".to_string(), 600)]));
        live.total_seconds = 20;
        live.tabs.insert("a.com".to_string(), 20);

        let snapshot = queue.live_snapshot(&live);

        assert_eq!(snapshot.total_seconds, 600);
        assert_eq!(snapshot.tabs.get("a.com"), Some(&600));
    }

    #[test]
    fn test_queue_rebuilt_from_records_dedups_dates() {
        let record = |total| DayRecord {
            date: date(25),
            total_time: total,
            tabs: vec![TabUsage {
                url: "a.com".to_string(),
                time_spent: total,
            }],
        };

        let queue = OfflineQueue::from_records(vec![record(10), record(20)]);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.to_records(), vec![record(20)]);
    }
}
