//! Focus state machine.
//!
//! [`FocusTracker::apply`] is a pure transition: it takes the current tracker
//! and one input and returns the next tracker plus the [`Effect`]s the engine
//! must carry out, in order. The tracker never touches the clock, the store or
//! the network, so every transition is testable in isolation.
//!
//! State derivation, first match wins:
//!
//! | Condition                                   | State              |
//! |---------------------------------------------|--------------------|
//! | not authenticated                           | `Unauthenticated`  |
//! | day capped                                  | `Idle`             |
//! | suspended                                   | `PausedNoFocus`    |
//! | locked, or idle without media               | `PausedSystemIdle` |
//! | no focused window or no trackable tab       | `Idle`/`PausedNoFocus` |
//! | otherwise                                   | `Tracking`         |

use super::hostname::{extract_hostname, is_media_host, is_trackable_url};
use super::notify::Signal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingState {
    Unauthenticated,
    Idle,
    Tracking,
    PausedSystemIdle,
    PausedNoFocus,
}

/// System idle state as reported by the browser's idle API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdleState {
    #[default]
    Active,
    Idle,
    Locked,
}

/// A browser tab as the host shim reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: i64,
    #[serde(default)]
    pub url: Option<String>,
}

/// Browser signals forwarded by the host shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusEvent {
    /// `focused: false` means no browser window has focus. A focused event
    /// carries the active tab of the newly focused window.
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged {
        focused: bool,
        #[serde(default)]
        minimized: bool,
        #[serde(default)]
        active_tab: Option<Tab>,
    },
    TabActivated { tab: Tab },
    TabUpdated { tab: Tab },
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: i64 },
    #[serde(rename_all = "camelCase")]
    NavigationCommitted {
        tab_id: i64,
        url: String,
        #[serde(default)]
        frame_id: i64,
    },
    IdleStateChanged { state: IdleState },
}

/// Everything that can move the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusInput {
    Browser(FocusEvent),
    /// The session was (re)derived.
    Authenticated(bool),
    /// The day hit its cap; latched until [`FocusInput::DayStarted`].
    Capped,
    DayStarted,
    Suspend,
    Resume,
    /// Restores the tab that was tracked before a restart.
    Restore(Tab),
}

/// Work the engine performs for a transition, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Book elapsed time against `hostname` before anything else changes.
    Flush { hostname: String },
    StartTimer,
    StopTimer,
    /// Re-arm the checkpoint at "now" after a hostname switch.
    RestartCheckpoint,
    Notify(Signal),
}

/// The focused tab. `hostname` is `None` for internal or missing URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub id: i64,
    pub hostname: Option<String>,
}

impl ActiveTab {
    fn from_tab(tab: &Tab) -> Self {
        Self {
            id: tab.id,
            hostname: tab
                .url
                .as_deref()
                .filter(|url| is_trackable_url(url))
                .map(extract_hostname),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags {
    pub authenticated: bool,
    pub idle: IdleState,
    pub media_active: bool,
    pub window_focused: bool,
    pub capped: bool,
    pub suspended: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            authenticated: false,
            idle: IdleState::Active,
            media_active: false,
            window_focused: true,
            capped: false,
            suspended: false,
        }
    }
}

impl Flags {
    /// Idle pauses tracking unless media is playing; locked always does.
    pub fn system_idle(&self) -> bool {
        match self.idle {
            IdleState::Active => false,
            IdleState::Idle => !self.media_active,
            IdleState::Locked => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTracker {
    state: TrackingState,
    flags: Flags,
    tab: Option<ActiveTab>,
    media_hosts: Vec<String>,
}

impl FocusTracker {
    pub fn new(media_hosts: Vec<String>) -> Self {
        Self {
            state: TrackingState::Unauthenticated,
            flags: Flags::default(),
            tab: None,
            media_hosts,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn tab(&self) -> Option<&ActiveTab> {
        self.tab.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    /// Hostname time is booked against; `Some` only while tracking.
    pub fn tracked_hostname(&self) -> Option<&str> {
        if !self.is_tracking() {
            return None;
        }
        self.tab.as_ref().and_then(|tab| tab.hostname.as_deref())
    }

    /// Applies `input` in place and returns the effects to run.
    pub fn handle(&mut self, input: &FocusInput) -> Vec<Effect> {
        let (next, effects) = self.apply(input);
        *self = next;
        effects
    }

    pub fn apply(&self, input: &FocusInput) -> (FocusTracker, Vec<Effect>) {
        let mut next = self.clone();
        match input {
            FocusInput::Browser(event) => {
                if !next.absorb(event) {
                    return (next, Vec::new());
                }
            }
            FocusInput::Authenticated(authenticated) => next.flags.authenticated = *authenticated,
            FocusInput::Capped => next.flags.capped = true,
            FocusInput::DayStarted => next.flags.capped = false,
            FocusInput::Suspend => next.flags.suspended = true,
            FocusInput::Resume => next.flags.suspended = false,
            FocusInput::Restore(tab) => {
                next.flags.window_focused = true;
                next.set_tab(Some(ActiveTab::from_tab(tab)));
            }
        }
        next.state = next.derive(self.state);
        let effects = self.effects_towards(&next);
        (next, effects)
    }

    /// Folds a browser event into flags and tab. Returns `false` when the event
    /// changes nothing at all.
    fn absorb(&mut self, event: &FocusEvent) -> bool {
        match event {
            FocusEvent::WindowFocusChanged { focused: false, .. } => {
                self.flags.window_focused = false;
            }
            FocusEvent::WindowFocusChanged { minimized: true, .. } => return false,
            FocusEvent::WindowFocusChanged { active_tab, .. } => {
                self.flags.window_focused = true;
                self.set_tab(active_tab.as_ref().map(ActiveTab::from_tab));
            }
            FocusEvent::TabActivated { tab } => self.set_tab(Some(ActiveTab::from_tab(tab))),
            FocusEvent::TabUpdated { tab } => {
                if !self.is_current(tab.id) || tab.url.is_none() {
                    return false;
                }
                self.set_tab(Some(ActiveTab::from_tab(tab)));
            }
            FocusEvent::TabRemoved { tab_id } => {
                if !self.is_current(*tab_id) {
                    return false;
                }
                self.set_tab(None);
            }
            FocusEvent::NavigationCommitted { tab_id, url, frame_id } => {
                if *frame_id != 0 || !self.is_current(*tab_id) {
                    return false;
                }
                self.set_tab(Some(ActiveTab::from_tab(&Tab {
                    id: *tab_id,
                    url: Some(url.clone()),
                })));
            }
            FocusEvent::IdleStateChanged { state } => self.flags.idle = *state,
        }
        true
    }

    fn is_current(&self, tab_id: i64) -> bool {
        self.tab.as_ref().is_some_and(|tab| tab.id == tab_id)
    }

    fn set_tab(&mut self, tab: Option<ActiveTab>) {
        self.flags.media_active = tab
            .as_ref()
            .and_then(|tab| tab.hostname.as_deref())
            .is_some_and(|host| is_media_host(host, &self.media_hosts));
        self.tab = tab;
    }

    fn derive(&self, previous: TrackingState) -> TrackingState {
        let has_target = self.flags.window_focused && self.tab.as_ref().is_some_and(|tab| tab.hostname.is_some());
        if !self.flags.authenticated {
            TrackingState::Unauthenticated
        } else if self.flags.capped {
            TrackingState::Idle
        } else if self.flags.suspended {
            TrackingState::PausedNoFocus
        } else if self.flags.system_idle() {
            TrackingState::PausedSystemIdle
        } else if !has_target {
            match previous {
                TrackingState::Idle | TrackingState::Unauthenticated => TrackingState::Idle,
                _ => TrackingState::PausedNoFocus,
            }
        } else {
            TrackingState::Tracking
        }
    }

    fn effects_towards(&self, next: &FocusTracker) -> Vec<Effect> {
        let mut effects = Vec::new();
        let before = self.tracked_hostname();
        let after = next.tracked_hostname();

        match (before, after) {
            (Some(old), None) => {
                effects.push(Effect::Flush { hostname: old.to_string() });
                effects.push(Effect::StopTimer);
                effects.push(Effect::Notify(next.paused_signal()));
            }
            (None, Some(new)) => {
                effects.push(Effect::StartTimer);
                if self.state == TrackingState::PausedSystemIdle {
                    effects.push(Effect::Notify(Signal::ResumedTracking));
                }
                effects.push(Effect::Notify(Signal::TrackingOn(new.to_string())));
            }
            (Some(old), Some(new)) => {
                let same_tab = self.tab.as_ref().map(|t| t.id) == next.tab.as_ref().map(|t| t.id);
                if old != new || !same_tab {
                    effects.push(Effect::Flush { hostname: old.to_string() });
                    effects.push(Effect::RestartCheckpoint);
                    effects.push(Effect::Notify(Signal::TrackingOn(new.to_string())));
                }
            }
            (None, None) => {}
        }
        effects
    }

    fn paused_signal(&self) -> Signal {
        match self.state {
            TrackingState::PausedSystemIdle => Signal::PausedSystemIdle,
            TrackingState::PausedNoFocus if !self.flags.window_focused => Signal::PausedNoFocus,
            _ => Signal::ReadyToTrack,
        }
    }
}
