//! Durable engine state on top of the key-value table.
//!
//! Writes always save the whole engine snapshot, so whatever is on disk is
//! resumable after an unexpected exit. Read and write failures are logged and
//! swallowed: a failed read looks like "no prior state", a failed write is a
//! no-op that reports `false`.

use super::dwell::{tabs_from_usage, usage_from_tabs, TabUsage, TrackingDay};
use super::queue::OfflineQueue;
use super::secret::Secret;
use crate::api::DayRecord;
use crate::db::{db::Db, kv::KeyValues};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    TotalTime,
    TabUsage,
    LastSyncDate,
    OfflineQueue,
    LastSyncedTotalTime,
    LastSyncedTabUsage,
    IsTracking,
    CurrentTabId,
    CurrentTabUrl,
    TabStartTime,
    Jwt,
    RefreshToken,
}

impl StorageKey {
    pub const ALL: [StorageKey; 12] = [
        StorageKey::TotalTime,
        StorageKey::TabUsage,
        StorageKey::LastSyncDate,
        StorageKey::OfflineQueue,
        StorageKey::LastSyncedTotalTime,
        StorageKey::LastSyncedTabUsage,
        StorageKey::IsTracking,
        StorageKey::CurrentTabId,
        StorageKey::CurrentTabUrl,
        StorageKey::TabStartTime,
        StorageKey::Jwt,
        StorageKey::RefreshToken,
    ];

    /// Keys making up the engine snapshot, i.e. everything except credentials.
    pub const STATE: [StorageKey; 10] = [
        StorageKey::TotalTime,
        StorageKey::TabUsage,
        StorageKey::LastSyncDate,
        StorageKey::OfflineQueue,
        StorageKey::LastSyncedTotalTime,
        StorageKey::LastSyncedTabUsage,
        StorageKey::IsTracking,
        StorageKey::CurrentTabId,
        StorageKey::CurrentTabUrl,
        StorageKey::TabStartTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::TotalTime => "totalTime",
            StorageKey::TabUsage => "tabUsage",
            StorageKey::LastSyncDate => "lastSyncDate",
            StorageKey::OfflineQueue => "offlineQueue",
            StorageKey::LastSyncedTotalTime => "lastSyncedTotalTime",
            StorageKey::LastSyncedTabUsage => "lastSyncedTabUsage",
            StorageKey::IsTracking => "isTracking",
            StorageKey::CurrentTabId => "currentTabId",
            StorageKey::CurrentTabUrl => "currentTabUrl",
            StorageKey::TabStartTime => "tabStartTime",
            StorageKey::Jwt => "jwt",
            StorageKey::RefreshToken => "refreshToken",
        }
    }
}

/// Everything the engine needs to pick up where it left off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub day: TrackingDay,
    pub queue: OfflineQueue,
    pub is_tracking: bool,
    pub current_tab_id: Option<i64>,
    /// Hostname of the tracked tab.
    pub current_tab_url: Option<String>,
    pub tab_start_time: Option<DateTime<Utc>>,
}

impl StoredState {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            day: TrackingDay::new(date),
            queue: OfflineQueue::new(),
            is_tracking: false,
            current_tab_id: None,
            current_tab_url: None,
            tab_start_time: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub jwt: Option<String>,
    pub refresh_token: Option<String>,
}

pub struct PersistenceLayer {
    kv: KeyValues,
    secret: Secret,
}

impl PersistenceLayer {
    pub fn new(db: Db) -> Self {
        Self {
            kv: KeyValues::new(db),
            secret: Secret::new(),
        }
    }

    /// Opens the store in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Db::new()?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Db::in_memory()?))
    }

    /// Reads `keys`; on failure logs and returns an empty map.
    pub fn get(&self, keys: &[StorageKey]) -> HashMap<StorageKey, Value> {
        let names: Vec<&str> = keys.iter().map(StorageKey::as_str).collect();
        match self.kv.get_many(&names) {
            Ok(mut values) => keys
                .iter()
                .filter_map(|key| values.remove(key.as_str()).map(|value| (*key, value)))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "storage read failed, treating as empty");
                HashMap::new()
            }
        }
    }

    /// Writes all `entries` in one transaction. `false` when the write failed.
    pub fn set(&mut self, entries: Vec<(StorageKey, Value)>) -> bool {
        let entries: Vec<(&str, Value)> = entries.into_iter().map(|(key, value)| (key.as_str(), value)).collect();
        match self.kv.set_many(&entries) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "storage write failed");
                false
            }
        }
    }

    pub fn remove(&mut self, keys: &[StorageKey]) -> bool {
        let names: Vec<&str> = keys.iter().map(StorageKey::as_str).collect();
        match self.kv.remove_many(&names) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "storage remove failed");
                false
            }
        }
    }

    /// Loads the engine snapshot. Missing or unreadable values fall back to
    /// defaults; a missing `lastSyncDate` means `today`.
    pub fn load_state(&self, today: NaiveDate) -> StoredState {
        let values = self.get(&StorageKey::STATE);
        let read = |key: StorageKey| values.get(&key).cloned();

        let date = decode::<NaiveDate>(read(StorageKey::LastSyncDate)).unwrap_or(today);
        let mut state = StoredState::empty(date);
        state.day.total_seconds = decode(read(StorageKey::TotalTime)).unwrap_or(0);
        state.day.tabs = tabs_from_usage(&decode::<Vec<TabUsage>>(read(StorageKey::TabUsage)).unwrap_or_default());
        state.day.last_synced_total_seconds = decode(read(StorageKey::LastSyncedTotalTime)).unwrap_or(0);
        state.day.last_synced_tabs =
            tabs_from_usage(&decode::<Vec<TabUsage>>(read(StorageKey::LastSyncedTabUsage)).unwrap_or_default());
        state.queue = OfflineQueue::from_records(decode::<Vec<DayRecord>>(read(StorageKey::OfflineQueue)).unwrap_or_default());
        state.is_tracking = decode(read(StorageKey::IsTracking)).unwrap_or(false);
        state.current_tab_id = decode(read(StorageKey::CurrentTabId));
        state.current_tab_url = decode(read(StorageKey::CurrentTabUrl));
        state.tab_start_time = decode::<i64>(read(StorageKey::TabStartTime)).and_then(DateTime::from_timestamp_millis);
        state
    }

    /// Saves the whole snapshot.
    pub fn save_state(&mut self, state: &StoredState) -> bool {
        self.set(vec![
            (StorageKey::TotalTime, json!(state.day.total_seconds)),
            (StorageKey::TabUsage, json!(usage_from_tabs(&state.day.tabs))),
            (StorageKey::LastSyncDate, json!(state.day.date)),
            (StorageKey::OfflineQueue, json!(state.queue.to_records())),
            (StorageKey::LastSyncedTotalTime, json!(state.day.last_synced_total_seconds)),
            (StorageKey::LastSyncedTabUsage, json!(usage_from_tabs(&state.day.last_synced_tabs))),
            (StorageKey::IsTracking, json!(state.is_tracking)),
            (StorageKey::CurrentTabId, json!(state.current_tab_id)),
            (StorageKey::CurrentTabUrl, json!(state.current_tab_url)),
            (StorageKey::TabStartTime, json!(state.tab_start_time.map(|t| t.timestamp_millis()))),
        ])
    }

    /// Loads the credential pair. Values that fail to unseal are dropped.
    pub fn load_tokens(&self) -> StoredTokens {
        let values = self.get(&[StorageKey::Jwt, StorageKey::RefreshToken]);
        let open = |key: StorageKey| {
            let sealed = decode::<String>(values.get(&key).cloned())?;
            match self.secret.open(&sealed) {
                Ok(plain) => Some(plain),
                Err(e) => {
                    tracing::warn!(key = key.as_str(), error = %e, "stored credential cannot be opened");
                    None
                }
            }
        };
        StoredTokens {
            jwt: open(StorageKey::Jwt),
            refresh_token: open(StorageKey::RefreshToken),
        }
    }

    /// Seals and saves the given tokens. `None` leaves the stored value untouched.
    pub fn save_tokens(&mut self, jwt: Option<&str>, refresh_token: Option<&str>) -> bool {
        let mut entries = Vec::new();
        for (key, plain) in [(StorageKey::Jwt, jwt), (StorageKey::RefreshToken, refresh_token)] {
            let Some(plain) = plain else { continue };
            match self.secret.seal(plain) {
                Ok(sealed) => entries.push((key, json!(sealed))),
                Err(e) => {
                    tracing::error!(key = key.as_str(), error = %e, "credential cannot be sealed");
                    return false;
                }
            }
        }
        entries.is_empty() || self.set(entries)
    }

    pub fn clear_tokens(&mut self) -> bool {
        self.remove(&[StorageKey::Jwt, StorageKey::RefreshToken])
    }

    pub fn clear_all(&mut self) -> bool {
        self.remove(&StorageKey::ALL)
    }
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> Option<T> {
    match value {
        None | Some(Value::Null) => None,
        Some(value) => serde_json::from_value(value)
            .map_err(|e| tracing::warn!(error = %e, "stored value has an unexpected shape"))
            .ok(),
    }
}
