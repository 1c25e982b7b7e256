//! The tracking engine.
//!
//! [`Tracker`] is the single owner of all mutable state: the live day, the
//! offline queue, the auth session and the focus state machine. It is driven
//! by one task (see [`daemon`](super::daemon)), so no locking is involved;
//! every handler runs to completion before the next one starts.
//!
//! Ordering rules every handler follows:
//!
//! - the day-rollover check runs before anything reads the live day
//! - pending elapsed time is flushed before tracking stops, before a suspend
//!   and before a sync attempt
//! - every mutation is persisted before the handler returns

use super::auth::AuthError;
use super::auth::AuthSessionManager;
use super::clock::Clock;
use super::config::{Config, TrackerConfig};
use super::dwell::{usage_from_tabs, DwellAccumulator, TickOutcome, TrackingDay, DAILY_CAP_SECS};
use super::focus::{Effect, FocusEvent, FocusInput, FocusTracker, Tab, TrackingState};
use super::notify::{Notifier, Signal};
use super::persistence::{PersistenceLayer, StoredState};
use super::protocol::{Request, Response};
use super::queue::{OfflineQueue, QueuedSnapshot};
use crate::api::ScreenTimeApi;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized { resumed: bool },
    AlreadyInitialized,
}

pub struct Tracker<A: ScreenTimeApi, C: Clock, N: Notifier> {
    pub(crate) api: A,
    pub(crate) clock: C,
    pub(crate) notifier: N,
    pub(crate) store: PersistenceLayer,
    pub(crate) config: TrackerConfig,
    pub(crate) web_app_url: String,
    pub(crate) auth: AuthSessionManager,
    pub(crate) focus: FocusTracker,
    pub(crate) dwell: DwellAccumulator,
    pub(crate) day: TrackingDay,
    pub(crate) queue: OfflineQueue,
    pub(crate) online: bool,
    initialized: bool,
    restored: bool,
    /// Tracking was active when the process was told to suspend.
    resume_after_suspend: bool,
}

impl<A: ScreenTimeApi, C: Clock, N: Notifier> Tracker<A, C, N> {
    pub fn new(api: A, clock: C, notifier: N, store: PersistenceLayer, config: &Config) -> Self {
        let tracker = config.tracker();
        let today = clock.today();
        Self {
            api,
            notifier,
            store,
            auth: AuthSessionManager::new(tracker.refresh_lead_secs),
            focus: FocusTracker::new(tracker.media_hosts.clone()),
            dwell: DwellAccumulator::new(tracker.daily_cap_secs.min(DAILY_CAP_SECS)),
            day: TrackingDay::new(today),
            queue: OfflineQueue::new(),
            online: true,
            initialized: false,
            restored: false,
            resume_after_suspend: false,
            web_app_url: config.server().web_app_url,
            config: tracker,
            clock,
        }
    }

    pub fn day(&self) -> &TrackingDay {
        &self.day
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn state(&self) -> TrackingState {
        self.focus.state()
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn auth(&self) -> &AuthSessionManager {
        &self.auth
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated(self.clock.now())
    }

    /// The 1-second dwell timer should be running.
    pub fn wants_ticks(&self) -> bool {
        self.focus.is_tracking() && self.dwell.is_running()
    }

    /// When the proactive token refresh is due, if one is scheduled.
    pub fn refresh_due_at(&self) -> Option<DateTime<Utc>> {
        self.auth.refresh_due_at()
    }

    /// Time left until the proactive token refresh, if one is scheduled.
    pub fn next_refresh_in(&self) -> Option<std::time::Duration> {
        let due = self.auth.refresh_due_at()?;
        Some((due - self.clock.now()).to_std().unwrap_or_default())
    }

    /// Loads prior state, resumes tracking and reconciles with the server.
    ///
    /// Runs once per process; later calls return
    /// [`InitOutcome::AlreadyInitialized`] without side effects.
    pub async fn initialize(&mut self) -> InitOutcome {
        if self.initialized {
            tracing::debug!("initialization already ran");
            return InitOutcome::AlreadyInitialized;
        }
        self.initialized = true;

        let resumed = self.restore().await;
        if resumed {
            self.notifier.notify(Signal::TrackingResumed);
        }

        if self.is_authenticated() {
            self.push().await;
            self.pull().await;
        } else {
            self.notifier.notify(Signal::LoginRequired);
        }
        InitOutcome::Initialized { resumed }
    }

    /// Loads the stored day, queue and credentials and picks tracking back up
    /// where the last process left it. The only network call is a token
    /// refresh when the stored one is about to expire.
    ///
    /// Returns whether tracking was resumed. Later calls are no-ops.
    pub async fn restore(&mut self) -> bool {
        if self.restored {
            return false;
        }
        self.restored = true;

        let today = self.clock.today();
        let stored = self.store.load_state(today);
        let stale_day = stored.day.date < today;
        self.day = stored.day;
        self.queue = stored.queue;

        self.load_session();
        if self.auth.needs_refresh(self.clock.now()) {
            self.refresh_session().await;
        }
        let authenticated = self.is_authenticated();
        // also rolls a stale day over
        self.transition(FocusInput::Authenticated(authenticated));

        let mut resumed = false;
        if !stale_day && authenticated && stored.is_tracking {
            if let (Some(id), Some(host)) = (stored.current_tab_id, stored.current_tab_url) {
                self.transition(FocusInput::Restore(Tab { id, url: Some(host) }));
                resumed = self.focus.is_tracking();
            }
        }
        self.persist();

        tracing::info!(date = %self.day.date, total = self.day.total_seconds, queued = self.queue.len(), authenticated, resumed, "state restored");
        resumed
    }

    /// Lifecycle notice from the browser (startup, install).
    pub fn announce(&self, signal: Signal) {
        self.notifier.notify(signal);
    }

    pub fn handle_event(&mut self, event: FocusEvent) {
        tracing::debug!(event = ?event, "browser event");
        self.transition(FocusInput::Browser(event));
    }

    /// One dwell-timer tick.
    pub fn tick(&mut self) -> TickOutcome {
        self.check_rollover();
        let Some(hostname) = self.focus.tracked_hostname().map(str::to_string) else {
            return TickOutcome::NotRunning;
        };
        let outcome = self.book(&hostname);
        if outcome.changed() {
            self.persist();
        }
        outcome
    }

    /// Books pending elapsed time against the tracked hostname, if any.
    pub fn flush(&mut self) -> TickOutcome {
        let Some(hostname) = self.focus.tracked_hostname().map(str::to_string) else {
            return TickOutcome::NotRunning;
        };
        self.book(&hostname)
    }

    pub async fn handle_request(&mut self, request: Request) -> Response {
        tracing::debug!(request = ?request, "ui request");
        match request {
            Request::Ping => Response::Status { status: "success" },
            Request::GetCurrentStats => {
                self.check_rollover();
                if self.flush().changed() {
                    self.persist();
                }
                Response::Stats {
                    status: "success",
                    total_time: self.day.total_seconds,
                    tab_usage: usage_from_tabs(&self.day.tabs),
                }
            }
            Request::GetTrackingStatus => Response::TrackingStatus {
                status: "success",
                is_tracking: self.focus.is_tracking(),
                current_tab_url: self.current_hostname(),
            },
            Request::GetScreenTime => Response::ScreenTime {
                total_time: self.day.total_seconds,
                tab_usage: usage_from_tabs(&self.day.tabs),
                is_tracking: self.focus.is_tracking(),
                current_tab_url: self.current_hostname(),
            },
            Request::SyncData => {
                self.push().await;
                Response::Success { success: true }
            }
            Request::ResetData => {
                self.reset();
                Response::Success { success: true }
            }
            Request::AuthUpdated { token, refresh_token } => {
                let is_authenticated = self.auth_updated(token, refresh_token);
                Response::Auth {
                    success: true,
                    is_authenticated,
                }
            }
            Request::Logout => {
                self.logout();
                Response::Success { success: true }
            }
            Request::OpenWebApp => {
                self.notifier.open_url(&self.web_app_url);
                Response::Success { success: true }
            }
        }
    }

    /// Forces a rollover of the current day: the live day is queued and zeroed.
    pub fn reset(&mut self) {
        self.check_rollover();
        self.flush();
        let now = self.clock.now();
        self.roll_over(self.clock.today(), now);
    }

    /// Persists freshly delivered tokens, then re-derives the session.
    pub fn auth_updated(&mut self, token: Option<String>, refresh_token: Option<String>) -> bool {
        if token.is_some() || refresh_token.is_some() {
            self.store.save_tokens(token.as_deref(), refresh_token.as_deref());
        }
        self.load_session();
        let authenticated = self.is_authenticated();
        self.transition(FocusInput::Authenticated(authenticated));
        tracing::info!(authenticated, "session re-derived");
        authenticated
    }

    /// Drops counters, queue and credentials.
    pub fn logout(&mut self) {
        self.transition(FocusInput::Authenticated(false));
        self.dwell.stop();
        self.auth.clear();
        self.day = TrackingDay::new(self.clock.today());
        self.queue.clear();
        self.resume_after_suspend = false;
        self.store.clear_all();
        self.notifier.notify(Signal::LoggedOut);
    }

    /// Process is about to be suspended: flush, persist, stop the timer.
    pub fn suspend(&mut self) {
        self.check_rollover();
        self.resume_after_suspend = self.focus.is_tracking();
        self.transition(FocusInput::Suspend);
        tracing::info!(resume = self.resume_after_suspend, "suspended");
    }

    pub fn suspend_canceled(&mut self) {
        let resume = self.resume_after_suspend;
        self.resume_after_suspend = false;
        self.transition(FocusInput::Resume);
        if resume && self.focus.is_tracking() {
            self.notifier.notify(Signal::TrackingRestored);
        }
    }

    /// Records a connectivity probe result. Coming back online pushes at once.
    pub async fn set_online(&mut self, online: bool) {
        if self.online == online {
            return;
        }
        self.online = online;
        if online {
            tracing::info!("back online");
            self.notifier.notify(Signal::BackOnline);
            self.push().await;
        } else {
            tracing::warn!("went offline");
            self.notifier.notify(Signal::WorkingOffline);
        }
    }

    /// Runs the proactive token refresh once it is due.
    pub async fn refresh_if_due(&mut self) -> bool {
        match self.auth.refresh_due_at() {
            Some(due) if self.clock.now() >= due => self.refresh_session().await,
            _ => false,
        }
    }

    /// Exchanges the refresh token. On failure the stored credentials are
    /// cleared, tracking stops and the user is asked to log in again.
    pub(crate) async fn refresh_session(&mut self) -> bool {
        match self.auth.refresh(&self.api).await {
            Ok(token) => {
                self.store.save_tokens(Some(&token), None);
                tracing::info!(expires_at = ?self.auth.session().and_then(|s| s.expires_at), "access token refreshed");
                self.transition(FocusInput::Authenticated(self.is_authenticated()));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                self.store.clear_tokens();
                self.transition(FocusInput::Authenticated(false));
                self.notifier.notify(Signal::SessionExpired);
                false
            }
        }
    }

    fn load_session(&mut self) {
        let tokens = self.store.load_tokens();
        match self.auth.load(tokens.jwt, tokens.refresh_token) {
            Ok(()) => {}
            Err(AuthError::MissingToken) => tracing::debug!("no access token stored"),
            Err(e) => tracing::warn!(error = %e, "stored access token rejected"),
        }
    }

    fn current_hostname(&self) -> Option<String> {
        self.focus.tab().and_then(|tab| tab.hostname.clone())
    }

    /// Feeds one input to the state machine and carries out its effects.
    pub(crate) fn transition(&mut self, input: FocusInput) {
        self.check_rollover();
        let effects = self.focus.handle(&input);
        self.run_effects(effects);
        self.persist();
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Flush { hostname } => {
                    self.book(&hostname);
                }
                Effect::StartTimer | Effect::RestartCheckpoint => {
                    if self.focus.is_tracking() {
                        self.dwell.start(self.clock.now());
                    }
                }
                Effect::StopTimer => self.dwell.stop(),
                Effect::Notify(signal) => self.notifier.notify(signal),
            }
        }
    }

    fn book(&mut self, hostname: &str) -> TickOutcome {
        let now = self.clock.now();
        self.book_at(hostname, now)
    }

    /// Accumulates against `hostname` up to `at`, leaving the tracking state on cap.
    fn book_at(&mut self, hostname: &str, at: DateTime<Utc>) -> TickOutcome {
        let outcome = self.dwell.accumulate(&mut self.day, hostname, at);
        if let TickOutcome::Capped(added) = outcome {
            tracing::warn!(date = %self.day.date, hostname, added, cap = self.dwell.cap(), "daily cap reached");
            let effects = self.focus.handle(&FocusInput::Capped);
            self.run_effects(effects);
            self.notifier.notify(Signal::DailyLimitReached);
        }
        outcome
    }

    /// Rolls the live day over when the UTC date moved on.
    ///
    /// Tracked time is split at midnight: the part before it goes into the old
    /// day before that day is snapshotted.
    pub(crate) fn check_rollover(&mut self) -> bool {
        self.check_session();
        let today = self.clock.today();
        if today <= self.day.date {
            return false;
        }

        let midnight = start_of(self.day.date.succ_opt().unwrap_or(today));
        if let Some(hostname) = self.focus.tracked_hostname().map(str::to_string) {
            if self.dwell.is_running() {
                self.book_at(&hostname, midnight);
            }
        }
        self.roll_over(today, start_of(today));
        true
    }

    /// Leaves tracking once the access token lapsed without a refresh.
    ///
    /// Time is booked up to the expiry instant (or the end of the live day,
    /// whichever comes first), never past it.
    fn check_session(&mut self) {
        let now = self.clock.now();
        if !self.focus.flags().authenticated || self.auth.is_authenticated(now) {
            return;
        }
        let expired_at = self.auth.session().and_then(|session| session.expires_at);
        if let Some(hostname) = self.focus.tracked_hostname().map(str::to_string) {
            if self.dwell.is_running() {
                let end_of_day = start_of(self.day.date.succ_opt().unwrap_or(self.day.date));
                let until = expired_at.unwrap_or(now).min(now).min(end_of_day);
                self.book_at(&hostname, until);
                self.dwell.stop();
            }
        }

        tracing::warn!(expired_at = ?expired_at, date = %self.day.date, total = self.day.total_seconds, "access token lapsed, tracking stopped");
        let effects = self.focus.handle(&FocusInput::Authenticated(false));
        self.run_effects(effects);
        if self.auth.session().is_some() {
            self.notifier.notify(Signal::SessionExpired);
        }
        self.persist();
    }

    /// Snapshots the live day into the queue (when non-empty) and starts
    /// `date` from zero. Tracking continues from `restart_at`.
    ///
    /// A lapsed session does not drop the day; it waits in the queue until
    /// the next login pushes it.
    fn roll_over(&mut self, date: NaiveDate, restart_at: DateTime<Utc>) {
        let previous = std::mem::replace(&mut self.day, TrackingDay::new(date));
        if !previous.is_empty() {
            tracing::info!(date = %previous.date, total = previous.total_seconds, "queued snapshot of finished day");
            self.queue.upsert(QueuedSnapshot::of_day(&previous));
        }

        let effects = self.focus.handle(&FocusInput::DayStarted);
        self.run_effects(effects);
        if self.focus.is_tracking() {
            self.dwell.start(restart_at);
        }
        self.persist();
        self.notifier.notify(Signal::NewDay(date.to_string()));
    }

    pub(crate) fn persist(&mut self) {
        let tab = self.focus.tab();
        let state = StoredState {
            day: self.day.clone(),
            queue: self.queue.clone(),
            is_tracking: self.focus.is_tracking() || self.resume_after_suspend,
            current_tab_id: tab.map(|tab| tab.id),
            current_tab_url: tab.and_then(|tab| tab.hostname.clone()),
            tab_start_time: self.dwell.checkpoint(),
        };
        self.store.save_state(&state);
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
