//! Push and pull against the remote store.
//!
//! Push sends absolute day snapshots (queued days plus the live day) and lets
//! the server max-merge them. Pull replaces the live day with the server's
//! record for it. Both retry transient failures with a linear backoff and
//! refresh the access token once on a 401.

use super::clock::Clock;
use super::dwell::tabs_from_usage;
use super::engine::Tracker;
use super::notify::{Notifier, Signal};
use super::queue::QueuedSnapshot;
use crate::api::{ApiError, DayRecord, ScreenTimeApi};
use chrono::NaiveDate;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// No valid session; nothing was sent or queued.
    LoginRequired,
    /// Offline or idle without media; the live day went to the queue instead.
    Queued,
    /// Nothing worth sending.
    NothingToSend,
    /// Every candidate was attempted. `failed` dates stay queued.
    Completed { sent: Vec<NaiveDate>, failed: Vec<NaiveDate> },
    /// The server rejected the credential and it could not be refreshed.
    SessionExpired { sent: Vec<NaiveDate> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The live day now mirrors the server.
    Replaced,
    /// The server has no record for the live day; local state kept.
    NoRemoteRecord,
    Skipped,
    /// Attempts exhausted; local state kept.
    Failed,
    SessionExpired,
}

impl<A: ScreenTimeApi, C: Clock, N: Notifier> Tracker<A, C, N> {
    /// Sends every unsynced day to the remote store.
    pub async fn push(&mut self) -> PushOutcome {
        self.check_rollover();
        if self.flush().changed() {
            self.persist();
        }

        if !self.is_authenticated() {
            self.notifier.notify(Signal::LoginRequired);
            return PushOutcome::LoginRequired;
        }
        if !self.online || self.focus.flags().system_idle() {
            let live = self.queue.live_snapshot(&self.day);
            if !live.is_empty() {
                self.queue.upsert(live);
                self.persist();
            }
            tracing::info!(online = self.online, queued = self.queue.len(), "push deferred");
            self.notifier.notify(Signal::OfflineOrIdleQueued);
            return PushOutcome::Queued;
        }

        let mut refreshed = false;
        let mut sent = Vec::new();
        'restart: loop {
            let candidates = self.queue.materialize(&self.day);
            if candidates.is_empty() {
                return PushOutcome::NothingToSend;
            }
            let Some(token) = self.auth.access_token().map(str::to_string) else {
                return PushOutcome::LoginRequired;
            };
            self.notifier.notify(Signal::Syncing);

            let mut failed = Vec::new();
            let mut timed_out = false;
            let mut pending = candidates.into_iter();
            while let Some(snapshot) = pending.next() {
                match self.send_with_retry(&token, &snapshot).await {
                    Ok(()) => {
                        tracing::info!(date = %snapshot.date, total = snapshot.total_seconds, "day synced");
                        self.confirm(&snapshot);
                        sent.push(snapshot.date);
                    }
                    Err(ApiError::Unauthorized) => {
                        // everything not yet confirmed, the live day included, waits for the next session
                        self.queue.upsert(snapshot);
                        pending.by_ref().for_each(|rest| self.queue.upsert(rest));
                        self.persist();
                        if !refreshed && self.refresh_session().await {
                            refreshed = true;
                            continue 'restart;
                        }
                        if refreshed {
                            self.notifier.notify(Signal::SessionExpired);
                        }
                        return PushOutcome::SessionExpired { sent };
                    }
                    Err(e) => {
                        tracing::warn!(date = %snapshot.date, error = %e, "day stays queued");
                        timed_out |= e == ApiError::Timeout;
                        failed.push(snapshot.date);
                        self.queue.upsert(snapshot);
                    }
                }
            }
            self.persist();

            match (failed.is_empty(), timed_out) {
                (true, _) => self.notifier.notify(Signal::Synced),
                (false, true) => self.notifier.notify(Signal::SyncTimeoutQueued),
                (false, false) => self.notifier.notify(Signal::QueuedLocally),
            }
            return PushOutcome::Completed { sent, failed };
        }
    }

    /// Posts one snapshot, retrying transient failures. A 401 returns at once.
    async fn send_with_retry(&self, token: &str, snapshot: &QueuedSnapshot) -> Result<(), ApiError> {
        let record = DayRecord::from(snapshot);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.api.upsert_day(token, &record).await {
                Ok(()) => return Ok(()),
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    tracing::debug!(date = %record.date, attempt, error = %e, "push attempt failed");
                    let backoff = Duration::from_millis(self.config.backoff_base_ms * attempt as u64);
                    self.clock.sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// The server accepted `snapshot`: drop it from the queue and, for the
    /// live day, remember what was sent.
    fn confirm(&mut self, snapshot: &QueuedSnapshot) {
        self.queue.drain([&snapshot.date]);
        if snapshot.date == self.day.date {
            self.day.mark_synced(snapshot.total_seconds, &snapshot.tabs);
        }
        self.persist();
    }

    /// Replaces the live day with the server's record for it.
    pub async fn pull(&mut self) -> PullOutcome {
        self.check_rollover();
        if !self.is_authenticated() {
            return PullOutcome::Skipped;
        }
        if !self.online || self.focus.flags().system_idle() {
            self.notifier.notify(Signal::WorkingOffline);
            return PullOutcome::Skipped;
        }
        self.notifier.notify(Signal::LoadingData);

        let max_attempts = self.config.max_attempts.max(1);
        let mut refreshed = false;
        let mut attempt = 1;
        loop {
            let Some(token) = self.auth.access_token().map(str::to_string) else {
                return PullOutcome::SessionExpired;
            };
            let error = match self.api.fetch_days(&token).await {
                Ok(days) => return self.apply_remote(days),
                Err(ApiError::Unauthorized) if !refreshed => {
                    refreshed = true;
                    if self.refresh_session().await {
                        continue;
                    }
                    return PullOutcome::SessionExpired;
                }
                Err(e) => e,
            };

            tracing::warn!(attempt, error = %error, "pull attempt failed");
            if attempt >= max_attempts {
                let signal = match error {
                    ApiError::Timeout => Signal::ServerSlowUsingLocal,
                    ApiError::Network(_) => Signal::WorkingOffline,
                    _ => Signal::UsingLocalData,
                };
                self.notifier.notify(signal);
                return PullOutcome::Failed;
            }
            self.clock
                .sleep(Duration::from_millis(self.config.pull_backoff_base_ms * attempt as u64))
                .await;
            attempt += 1;
        }
    }

    fn apply_remote(&mut self, days: Vec<DayRecord>) -> PullOutcome {
        let outcome = match days.into_iter().find(|record| record.date == self.day.date) {
            // The running checkpoint is kept, so time since the last tick lands on top of the server values.
            Some(record) => {
                tracing::info!(date = %record.date, local = self.day.total_seconds, remote = record.total_time, "live day replaced by server record");
                let cap = self.dwell.cap();
                self.day.replace_from_remote(record.total_time, tabs_from_usage(&record.tabs), cap);
                self.persist();
                PullOutcome::Replaced
            }
            None => PullOutcome::NoRemoteRecord,
        };
        self.notifier.notify(Signal::DataLoaded);
        outcome
    }
}
