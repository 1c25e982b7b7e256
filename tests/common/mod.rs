//! Shared doubles for the engine tests: a scripted remote store, a recording
//! notifier and a tracker wired to both over an in-memory store.
#![allow(dead_code)]

use base64::prelude::*;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dwellsync::api::{ApiError, DayRecord, ScreenTimeApi};
use dwellsync::libs::clock::ManualClock;
use dwellsync::libs::config::{Config, TrackerConfig};
use dwellsync::libs::engine::Tracker;
use dwellsync::libs::notify::{Notifier, Signal};
use dwellsync::libs::persistence::PersistenceLayer;
use serde_json::json;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Far enough in the future for every test clock.
pub const FAR_FUTURE_EXP: i64 = 1_900_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch { token: String },
    Upsert { token: String, record: DayRecord },
    Refresh { refresh_token: String },
}

#[derive(Default)]
struct Script {
    fetch: VecDeque<Result<Vec<DayRecord>, ApiError>>,
    upsert: VecDeque<Result<(), ApiError>>,
    refresh: VecDeque<Result<String, ApiError>>,
    calls: Vec<Call>,
}

/// Answers from scripted queues. Once a queue runs dry: fetch returns no
/// days, upsert succeeds and refresh is rejected.
#[derive(Clone, Default)]
pub struct MockApi {
    script: Rc<RefCell<Script>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_fetch(&self, result: Result<Vec<DayRecord>, ApiError>) {
        self.script.borrow_mut().fetch.push_back(result);
    }

    pub fn on_upsert(&self, result: Result<(), ApiError>) {
        self.script.borrow_mut().upsert.push_back(result);
    }

    pub fn on_refresh(&self, result: Result<String, ApiError>) {
        self.script.borrow_mut().refresh.push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.borrow().calls.clone()
    }

    pub fn upserts(&self) -> Vec<(String, DayRecord)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upsert { token, record } => Some((token, record)),
                _ => None,
            })
            .collect()
    }
}

impl ScreenTimeApi for MockApi {
    async fn fetch_days(&self, token: &str) -> Result<Vec<DayRecord>, ApiError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Fetch { token: token.to_string() });
        script.fetch.pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn upsert_day(&self, token: &str, record: &DayRecord) -> Result<(), ApiError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Upsert {
            token: token.to_string(),
            record: record.clone(),
        });
        script.upsert.pop_front().unwrap_or(Ok(()))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(Call::Refresh {
            refresh_token: refresh_token.to_string(),
        });
        script.refresh.pop_front().unwrap_or(Err(ApiError::Unauthorized))
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    signals: Rc<RefCell<Vec<Signal>>>,
    opened: Rc<RefCell<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.borrow().clone()
    }

    pub fn saw(&self, signal: &Signal) -> bool {
        self.signals.borrow().contains(signal)
    }

    pub fn count(&self, signal: &Signal) -> usize {
        self.signals.borrow().iter().filter(|s| *s == signal).count()
    }

    pub fn clear(&self) {
        self.signals.borrow_mut().clear();
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, signal: Signal) {
        self.signals.borrow_mut().push(signal);
    }

    fn open_url(&self, url: &str) {
        self.opened.borrow_mut().push(url.to_string());
    }
}

/// Unsigned JWT with the given `exp` claim.
pub fn jwt(exp: Option<i64>) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = match exp {
        Some(exp) => json!({ "sub": "user-1", "exp": exp }),
        None => json!({ "sub": "user-1" }),
    };
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn config_with(tracker: TrackerConfig) -> Config {
    Config {
        server: None,
        tracker: Some(tracker),
    }
}

pub type TestTracker = Tracker<MockApi, ManualClock, RecordingNotifier>;

pub struct Harness {
    pub tracker: TestTracker,
    pub api: MockApi,
    pub clock: ManualClock,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(store: PersistenceLayer, start: DateTime<Utc>, config: &Config) -> Self {
        let api = MockApi::new();
        let clock = ManualClock::new(start);
        let notifier = RecordingNotifier::default();
        let tracker = Tracker::new(api.clone(), clock.clone(), notifier.clone(), store, config);
        Self {
            tracker,
            api,
            clock,
            notifier,
        }
    }

    /// In-memory store holding a valid token pair.
    pub fn logged_in(start: DateTime<Utc>) -> Self {
        Self::logged_in_with(start, &Config::default())
    }

    pub fn logged_in_with(start: DateTime<Utc>, config: &Config) -> Self {
        let mut store = PersistenceLayer::in_memory().unwrap();
        store.save_tokens(Some(&jwt(Some(FAR_FUTURE_EXP))), Some("refresh-1"));
        Self::new(store, start, config)
    }

    pub fn logged_out(start: DateTime<Utc>) -> Self {
        Self::new(PersistenceLayer::in_memory().unwrap(), start, &Config::default())
    }
}
