mod common;

#[cfg(test)]
mod tests {
    use super::common::{at, config_with, date, jwt, Call, Harness, FAR_FUTURE_EXP};
    use dwellsync::db::db::Db;
    use dwellsync::libs::config::{Config, TrackerConfig};
    use dwellsync::libs::dwell::TrackingDay;
    use dwellsync::libs::engine::InitOutcome;
    use dwellsync::libs::focus::{FocusEvent, IdleState, Tab, TrackingState};
    use dwellsync::libs::notify::Signal;
    use dwellsync::libs::persistence::{PersistenceLayer, StorageKey, StoredState};
    use dwellsync::libs::protocol::{Request, Response};
    use serde_json::json;
    use tempfile::TempDir;

    fn activate(id: i64, url: &str) -> FocusEvent {
        FocusEvent::TabActivated {
            tab: Tab {
                id,
                url: Some(url.to_string()),
            },
        }
    }

    fn store_at(dir: &TempDir) -> PersistenceLayer {
        PersistenceLayer::new(Db::open(dir.path().join("dwellsync.db")).unwrap())
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));

        assert_eq!(h.tracker.initialize().await, InitOutcome::Initialized { resumed: false });
        let calls = h.api.calls().len();
        assert_eq!(h.tracker.initialize().await, InitOutcome::AlreadyInitialized);

        assert_eq!(h.api.calls().len(), calls);
        assert_eq!(h.tracker.state(), TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_without_credentials_nothing_is_tracked() {
        let mut h = Harness::logged_out(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;

        assert!(h.notifier.saw(&Signal::LoginRequired));
        h.tracker.handle_event(activate(1, "https://example.com/"));
        h.clock.advance_secs(30);
        h.tracker.tick();

        assert_eq!(h.tracker.state(), TrackingState::Unauthenticated);
        assert!(h.tracker.day().is_empty());
        assert!(h.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_day_rollover_queues_previous_day() {
        let mut store = PersistenceLayer::in_memory().unwrap();
        let mut state = StoredState::empty(date(2025, 6, 25));
        state.day.total_seconds = 5400;
        state.day.tabs.insert("example.com".to_string(), 3600);
        state.day.tabs.insert("docs.rs".to_string(), 1800);
        store.save_state(&state);
        store.save_tokens(Some(&jwt(Some(FAR_FUTURE_EXP))), None);
        let mut h = Harness::new(store, at(2025, 6, 25, 23, 30, 0), &Config::default());
        h.tracker.initialize().await;

        h.clock.set(at(2025, 6, 26, 0, 0, 5));
        h.tracker.tick();

        let queued = h.tracker.queue().get(&date(2025, 6, 25)).cloned().unwrap();
        assert_eq!(queued.total_seconds, 5400);
        assert_eq!(queued.tabs, state.day.tabs);
        assert_eq!(h.tracker.day(), &TrackingDay::new(date(2025, 6, 26)));
        assert!(h.notifier.saw(&Signal::NewDay("2025-06-26".to_string())));
    }

    #[tokio::test]
    async fn test_rollover_splits_tracked_time_at_midnight() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 23, 59, 50));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));

        h.clock.set(at(2025, 6, 26, 0, 0, 10));
        h.tracker.tick();

        assert_eq!(h.tracker.queue().get(&date(2025, 6, 25)).map(|s| s.total_seconds), Some(10));
        assert_eq!(h.tracker.day().date, date(2025, 6, 26));
        assert_eq!(h.tracker.day().tabs.get("example.com"), Some(&10));
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_stale_day_on_startup_is_queued_and_not_resumed() {
        let mut store = PersistenceLayer::in_memory().unwrap();
        let mut state = StoredState::empty(date(2025, 6, 24));
        state.day.total_seconds = 120;
        state.day.tabs.insert("example.com".to_string(), 120);
        state.is_tracking = true;
        state.current_tab_id = Some(4);
        state.current_tab_url = Some("example.com".to_string());
        store.save_state(&state);
        store.save_tokens(Some(&jwt(Some(FAR_FUTURE_EXP))), None);
        let mut h = Harness::new(store, at(2025, 6, 26, 8, 0, 0), &Config::default());
        // keep the queued day local
        h.api.on_upsert(Err(dwellsync::api::ApiError::Status(503)));
        h.api.on_upsert(Err(dwellsync::api::ApiError::Status(503)));
        h.api.on_upsert(Err(dwellsync::api::ApiError::Status(503)));

        assert_eq!(h.tracker.initialize().await, InitOutcome::Initialized { resumed: false });

        assert_eq!(h.tracker.day().date, date(2025, 6, 26));
        assert!(h.tracker.day().is_empty());
        assert_eq!(h.tracker.queue().get(&date(2025, 6, 24)).map(|s| s.total_seconds), Some(120));
        assert_ne!(h.tracker.state(), TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_tracking_resumes_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = store_at(&dir);
            store.save_tokens(Some(&jwt(Some(FAR_FUTURE_EXP))), Some("refresh-1"));
            let mut h = Harness::new(store, at(2025, 6, 25, 10, 0, 0), &Config::default());
            h.tracker.initialize().await;
            h.tracker.handle_event(activate(9, "https://example.com/inbox"));
            h.clock.advance_secs(30);
            h.tracker.tick();
        }

        let mut h = Harness::new(store_at(&dir), at(2025, 6, 25, 10, 5, 0), &Config::default());
        assert_eq!(h.tracker.initialize().await, InitOutcome::Initialized { resumed: true });

        assert_eq!(h.tracker.state(), TrackingState::Tracking);
        assert_eq!(h.tracker.day().total_seconds, 30);
        assert!(h.notifier.saw(&Signal::TrackingResumed));
        // the gap while the process was down is not counted
        h.clock.advance_secs(2);
        h.tracker.tick();
        assert_eq!(h.tracker.day().tabs.get("example.com"), Some(&32));
    }

    #[tokio::test]
    async fn test_rapid_tab_switching_books_whole_seconds_only() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;

        for i in 0..20 {
            let url = if i % 2 == 0 { "https://a.example/" } else { "https://b.example/" };
            h.tracker.handle_event(activate(i, url));
            h.clock.advance_millis(400);
        }

        assert!(h.tracker.day().is_empty());
        assert_eq!(h.tracker.day().total_seconds, h.tracker.day().tabs_sum());
    }

    #[tokio::test]
    async fn test_idle_pauses_unless_media_is_playing() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));

        h.clock.advance_secs(5);
        h.tracker.handle_event(FocusEvent::IdleStateChanged { state: IdleState::Idle });
        assert_eq!(h.tracker.state(), TrackingState::PausedSystemIdle);
        assert_eq!(h.tracker.day().total_seconds, 5);
        assert!(h.notifier.saw(&Signal::PausedSystemIdle));

        h.clock.advance_secs(60);
        h.tracker.handle_event(FocusEvent::IdleStateChanged { state: IdleState::Active });
        assert!(h.notifier.saw(&Signal::ResumedTracking));

        h.tracker.handle_event(activate(2, "https://www.youtube.com/watch?v=1"));
        h.tracker.handle_event(FocusEvent::IdleStateChanged { state: IdleState::Idle });
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
        h.clock.advance_secs(10);
        h.tracker.tick();
        assert_eq!(h.tracker.day().tabs.get("www.youtube.com"), Some(&10));
        assert_eq!(h.tracker.day().total_seconds, 15);
    }

    #[tokio::test]
    async fn test_suspend_flushes_and_cancel_restores() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));
        h.clock.advance_secs(7);

        h.tracker.suspend();
        assert_eq!(h.tracker.day().total_seconds, 7);
        assert_ne!(h.tracker.state(), TrackingState::Tracking);
        assert!(!h.tracker.wants_ticks());

        h.clock.advance_secs(20);
        h.tracker.suspend_canceled();
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
        assert!(h.notifier.saw(&Signal::TrackingRestored));
        h.clock.advance_secs(1);
        h.tracker.tick();
        assert_eq!(h.tracker.day().total_seconds, 8);
    }

    #[tokio::test]
    async fn test_requests_answer_from_live_state() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/a"));
        h.clock.advance_secs(12);

        assert_eq!(h.tracker.handle_request(Request::Ping).await, Response::Status { status: "success" });

        let stats = h.tracker.handle_request(Request::GetCurrentStats).await;
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({"status": "success", "totalTime": 12, "tabUsage": [{"url": "example.com", "timeSpent": 12}]})
        );

        let status = h.tracker.handle_request(Request::GetTrackingStatus).await;
        assert_eq!(
            status,
            Response::TrackingStatus {
                status: "success",
                is_tracking: true,
                current_tab_url: Some("example.com".to_string()),
            }
        );

        h.tracker.handle_request(Request::OpenWebApp).await;
        assert_eq!(h.notifier.opened(), vec![Config::default().server().web_app_url]);
    }

    #[tokio::test]
    async fn test_reset_queues_today_and_zeroes_counters() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));
        h.clock.advance_secs(40);

        let response = h.tracker.handle_request(Request::ResetData).await;

        assert_eq!(response, Response::Success { success: true });
        assert_eq!(h.tracker.day().total_seconds, 0);
        assert_eq!(h.tracker.queue().get(&date(2025, 6, 25)).map(|s| s.total_seconds), Some(40));
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_auth_updated_starts_session() {
        let mut h = Harness::logged_out(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));

        let response = h
            .tracker
            .handle_request(Request::AuthUpdated {
                token: Some(jwt(Some(FAR_FUTURE_EXP))),
                refresh_token: Some("refresh-2".to_string()),
            })
            .await;

        assert_eq!(
            response,
            Response::Auth {
                success: true,
                is_authenticated: true,
            }
        );
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
        assert_eq!(h.tracker.auth().refresh_token(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_on_startup() {
        let mut store = PersistenceLayer::in_memory().unwrap();
        store.save_tokens(Some(&jwt(Some(1_700_000_000))), Some("refresh-1"));
        let mut h = Harness::new(store, at(2025, 6, 25, 10, 0, 0), &Config::default());
        let fresh = jwt(Some(FAR_FUTURE_EXP));
        h.api.on_refresh(Ok(fresh.clone()));

        h.tracker.initialize().await;

        assert!(h.tracker.is_authenticated());
        assert_eq!(h.tracker.auth().access_token(), Some(fresh.as_str()));
        assert!(!h.notifier.saw(&Signal::LoginRequired));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_at(&dir);
        store.save_tokens(Some(&jwt(Some(FAR_FUTURE_EXP))), Some("refresh-1"));
        let mut h = Harness::new(store, at(2025, 6, 25, 10, 0, 0), &Config::default());
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));
        h.clock.advance_secs(9);
        h.tracker.tick();

        h.tracker.handle_request(Request::Logout).await;

        assert_eq!(h.tracker.state(), TrackingState::Unauthenticated);
        assert!(h.tracker.day().is_empty());
        assert!(h.tracker.queue().is_empty());
        assert!(h.notifier.saw(&Signal::LoggedOut));
        let reopened = store_at(&dir);
        assert!(reopened.get(&StorageKey::ALL).is_empty());
    }

    #[tokio::test]
    async fn test_lapsed_token_stops_tracking_and_keeps_the_day() {
        let mut store = PersistenceLayer::in_memory().unwrap();
        store.save_tokens(Some(&jwt(Some(at(2025, 6, 25, 23, 10, 0).timestamp()))), None);
        let mut h = Harness::new(store, at(2025, 6, 25, 23, 0, 0), &Config::default());
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));
        assert_eq!(h.tracker.state(), TrackingState::Tracking);

        h.clock.set(at(2025, 6, 25, 23, 30, 0));
        h.tracker.tick();

        // booked up to the expiry, not past it
        assert_eq!(h.tracker.state(), TrackingState::Unauthenticated);
        assert_eq!(h.tracker.day().total_seconds, 600);
        assert!(h.notifier.saw(&Signal::SessionExpired));

        h.clock.set(at(2025, 6, 26, 0, 30, 0));
        h.tracker.tick();

        assert_eq!(h.tracker.day().date, date(2025, 6, 26));
        assert!(h.tracker.day().is_empty());
        let queued = h.tracker.queue().get(&date(2025, 6, 25)).cloned().unwrap();
        assert_eq!(queued.total_seconds, 600);
        assert_eq!(queued.tabs.get("example.com"), Some(&600));
    }

    #[tokio::test]
    async fn test_proactive_refresh_runs_once_due() {
        let start = at(2025, 6, 25, 10, 0, 0);
        let mut store = PersistenceLayer::in_memory().unwrap();
        store.save_tokens(Some(&jwt(Some(start.timestamp() + 30))), Some("refresh-1"));
        let mut h = Harness::new(store, start, &Config::default());
        let fresh = jwt(Some(FAR_FUTURE_EXP));
        h.api.on_refresh(Ok(fresh.clone()));
        h.tracker.initialize().await;

        // 60 s lead on a token that expires in 30 s
        assert_eq!(h.tracker.next_refresh_in(), Some(std::time::Duration::ZERO));
        assert!(h.tracker.refresh_if_due().await);

        assert_eq!(h.tracker.auth().access_token(), Some(fresh.as_str()));
        assert!(h.tracker.next_refresh_in().is_some_and(|left| left > std::time::Duration::from_secs(3600)));
        assert!(!h.tracker.refresh_if_due().await);
        let refreshes = h.api.calls().into_iter().filter(|call| matches!(call, Call::Refresh { .. })).count();
        assert_eq!(refreshes, 1);
    }

    #[tokio::test]
    async fn test_refresh_is_not_attempted_early() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;

        assert!(!h.tracker.refresh_if_due().await);
        assert!(h.api.calls().iter().all(|call| !matches!(call, Call::Refresh { .. })));
    }

    #[tokio::test]
    async fn test_unparsable_url_is_booked_as_unknown() {
        let mut h = Harness::logged_in(at(2025, 6, 25, 10, 0, 0));
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(3, "https://exa mple.com/"));

        h.clock.advance_secs(5);
        h.tracker.tick();

        assert_eq!(h.tracker.state(), TrackingState::Tracking);
        assert_eq!(h.tracker.day().tabs.get("unknown"), Some(&5));
        assert_eq!(h.tracker.day().total_seconds, 5);
    }

    #[tokio::test]
    async fn test_cap_reached_across_midnight_is_announced() {
        let config = config_with(TrackerConfig {
            daily_cap_secs: 60,
            ..TrackerConfig::default()
        });
        let mut h = Harness::logged_in_with(at(2025, 6, 25, 23, 58, 30), &config);
        h.tracker.initialize().await;
        h.tracker.handle_event(activate(1, "https://example.com/"));

        h.clock.set(at(2025, 6, 26, 0, 0, 10));
        h.tracker.tick();

        assert!(h.notifier.saw(&Signal::DailyLimitReached));
        assert_eq!(h.tracker.queue().get(&date(2025, 6, 25)).map(|s| s.total_seconds), Some(60));
        // the new day starts uncapped from midnight
        assert_eq!(h.tracker.day().tabs.get("example.com"), Some(&10));
        assert_eq!(h.tracker.state(), TrackingState::Tracking);
    }
}
