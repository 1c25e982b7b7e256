#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use dwellsync::db::db::Db;
    use dwellsync::libs::persistence::{PersistenceLayer, StorageKey, StoredState};
    use dwellsync::libs::queue::QueuedSnapshot;
    use serde_json::json;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct StoreTestContext {
        dir: TempDir,
        today: NaiveDate,
    }

    impl TestContext for StoreTestContext {
        fn setup() -> Self {
            StoreTestContext {
                dir: tempfile::tempdir().unwrap(),
                today: NaiveDate::from_ymd_opt(2025, 6, 26).unwrap(),
            }
        }
    }

    impl StoreTestContext {
        fn open(&self) -> PersistenceLayer {
            PersistenceLayer::new(Db::open(self.dir.path().join("store.db")).unwrap())
        }
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_empty_store_loads_defaults(ctx: &mut StoreTestContext) {
        let store = ctx.open();
        assert_eq!(store.load_state(ctx.today), StoredState::empty(ctx.today));
        assert_eq!(store.load_tokens().jwt, None);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_state_survives_reopen(ctx: &mut StoreTestContext) {
        let mut state = StoredState::empty(ctx.today);
        state.day.total_seconds = 95;
        state.day.tabs.insert("example.com".to_string(), 60);
        state.day.tabs.insert("docs.rs".to_string(), 35);
        state.day.last_synced_total_seconds = 60;
        state.day.last_synced_tabs.insert("example.com".to_string(), 60);
        state.queue.upsert(QueuedSnapshot {
            date: NaiveDate::from_ymd_opt(2025, 6, 25).unwrap(),
            total_seconds: 7200,
            tabs: [("example.com".to_string(), 7200)].into_iter().collect(),
        });
        state.is_tracking = true;
        state.current_tab_id = Some(17);
        state.current_tab_url = Some("example.com".to_string());
        state.tab_start_time = DateTime::from_timestamp_millis(1_750_900_000_123);

        assert!(ctx.open().save_state(&state));

        let loaded = ctx.open().load_state(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(loaded, state);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_values_use_flat_wire_names(ctx: &mut StoreTestContext) {
        let mut store = ctx.open();
        let mut state = StoredState::empty(ctx.today);
        state.day.total_seconds = 5;
        state.day.tabs.insert("example.com".to_string(), 5);
        store.save_state(&state);

        let values = store.get(&[StorageKey::TotalTime, StorageKey::TabUsage, StorageKey::LastSyncDate]);

        assert_eq!(values[&StorageKey::TotalTime], json!(5));
        assert_eq!(values[&StorageKey::TabUsage], json!([{"url": "example.com", "timeSpent": 5}]));
        assert_eq!(values[&StorageKey::LastSyncDate], json!("2025-06-26"));
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_malformed_values_fall_back_to_defaults(ctx: &mut StoreTestContext) {
        let mut store = ctx.open();
        store.set(vec![
            (StorageKey::TotalTime, json!("lots")),
            (StorageKey::OfflineQueue, json!({"not": "a list"})),
            (StorageKey::IsTracking, json!(true)),
        ]);

        let state = store.load_state(ctx.today);

        assert_eq!(state.day.total_seconds, 0);
        assert!(state.queue.is_empty());
        assert!(state.is_tracking);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_tokens_are_sealed_at_rest(ctx: &mut StoreTestContext) {
        let mut store = ctx.open();
        assert!(store.save_tokens(Some("header.payload.sig"), Some("refresh-abc")));

        let raw = store.get(&[StorageKey::Jwt]);
        let sealed = raw[&StorageKey::Jwt].as_str().unwrap();
        assert!(sealed.starts_with("sealed:"));
        assert!(!sealed.contains("header.payload.sig"));

        let tokens = ctx.open().load_tokens();
        assert_eq!(tokens.jwt.as_deref(), Some("header.payload.sig"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-abc"));
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_saving_one_token_keeps_the_other(ctx: &mut StoreTestContext) {
        let mut store = ctx.open();
        store.save_tokens(Some("old.jwt.sig"), Some("refresh-abc"));
        store.save_tokens(Some("new.jwt.sig"), None);

        let tokens = store.load_tokens();
        assert_eq!(tokens.jwt.as_deref(), Some("new.jwt.sig"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-abc"));
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_clear_tokens_keeps_state(ctx: &mut StoreTestContext) {
        let mut store = ctx.open();
        let mut state = StoredState::empty(ctx.today);
        state.day.total_seconds = 3;
        store.save_state(&state);
        store.save_tokens(Some("a.b.c"), Some("r"));

        assert!(store.clear_tokens());

        assert_eq!(store.load_tokens().jwt, None);
        assert_eq!(store.load_state(ctx.today).day.total_seconds, 3);

        assert!(store.clear_all());
        assert!(store.get(&StorageKey::ALL).is_empty());
    }
}
