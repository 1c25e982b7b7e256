//! User-visible status signals.
//!
//! Components raise a [`Signal`]; a [`Notifier`] decides how it reaches the
//! user. The native host turns signals into badge frames, the one-shot CLI
//! prints them. Notification is best effort and never feeds back into control
//! flow.

use super::messages::Message;
use crate::libs::protocol::Outbound;
use crate::{msg_error, msg_info, msg_success, msg_warning};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Ready,
    Started,
    /// Persistent badge while a hostname accrues time.
    TrackingOn(String),
    /// Persistent badge when nothing is tracked.
    ReadyToTrack,
    TrackingResumed,
    TrackingRestored,
    PausedNoFocus,
    PausedSystemIdle,
    ResumedTracking,
    DailyLimitReached,
    NewDay(String),
    Syncing,
    Synced,
    LoadingData,
    DataLoaded,
    QueuedLocally,
    SyncTimeoutQueued,
    OfflineOrIdleQueued,
    WorkingOffline,
    ServerSlowUsingLocal,
    UsingLocalData,
    BackOnline,
    LoginRequired,
    SessionExpired,
    LoggedOut,
    StorageUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Success,
    Sync,
    Info,
}

impl Severity {
    fn badge_text(&self) -> &'static str {
        match self {
            Severity::Error => "!",
            Severity::Warning => "⚠",
            Severity::Success => "✓",
            Severity::Sync => "↻",
            Severity::Info => "i",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Severity::Error => "#dc2626",
            Severity::Warning => "#f59e0b",
            Severity::Success => "#10b981",
            Severity::Sync => "#3b82f6",
            Severity::Info => "#64748b",
        }
    }

    /// How long a transient badge stays before the shim restores the persistent one.
    pub fn clear_after(&self) -> Duration {
        match self {
            Severity::Error => Duration::from_millis(8_000),
            Severity::Warning => Duration::from_millis(6_000),
            _ => Duration::from_millis(4_000),
        }
    }
}

/// Badge state sent to the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub text: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_after_ms: Option<u64>,
}

impl Signal {
    pub fn message(&self) -> Message {
        match self {
            Signal::Ready => Message::Ready,
            Signal::Started => Message::Started,
            Signal::TrackingOn(host) => Message::TrackingOn(host.clone()),
            Signal::ReadyToTrack => Message::ReadyToTrack,
            Signal::TrackingResumed => Message::TrackingResumed,
            Signal::TrackingRestored => Message::TrackingRestored,
            Signal::PausedNoFocus => Message::PausedNoFocus,
            Signal::PausedSystemIdle => Message::PausedSystemIdle,
            Signal::ResumedTracking => Message::ResumedTracking,
            Signal::DailyLimitReached => Message::DailyLimitReached,
            Signal::NewDay(date) => Message::NewDay(date.clone()),
            Signal::Syncing => Message::Syncing,
            Signal::Synced => Message::Synced,
            Signal::LoadingData => Message::LoadingData,
            Signal::DataLoaded => Message::DataLoaded,
            Signal::QueuedLocally => Message::QueuedLocally,
            Signal::SyncTimeoutQueued => Message::SyncTimeoutQueued,
            Signal::OfflineOrIdleQueued => Message::OfflineOrIdleQueued,
            Signal::WorkingOffline => Message::WorkingOffline,
            Signal::ServerSlowUsingLocal => Message::ServerSlowUsingLocal,
            Signal::UsingLocalData => Message::UsingLocalData,
            Signal::BackOnline => Message::BackOnline,
            Signal::LoginRequired => Message::LoginRequired,
            Signal::SessionExpired => Message::SessionExpired,
            Signal::LoggedOut => Message::LoggedOut,
            Signal::StorageUnavailable(err) => Message::StorageUnavailable(err.clone()),
        }
    }

    /// `None` for the persistent tracking badges, which never self-clear.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Signal::TrackingOn(_) | Signal::ReadyToTrack => None,
            Signal::StorageUnavailable(_) => Some(Severity::Error),
            Signal::DailyLimitReached
            | Signal::QueuedLocally
            | Signal::SyncTimeoutQueued
            | Signal::OfflineOrIdleQueued
            | Signal::WorkingOffline
            | Signal::ServerSlowUsingLocal
            | Signal::UsingLocalData
            | Signal::SessionExpired => Some(Severity::Warning),
            Signal::Ready | Signal::Synced | Signal::DataLoaded | Signal::BackOnline | Signal::LoggedOut => Some(Severity::Success),
            Signal::Syncing | Signal::LoadingData => Some(Severity::Sync),
            _ => Some(Severity::Info),
        }
    }

    pub fn badge(&self) -> Badge {
        match (self, self.severity()) {
            (Signal::TrackingOn(host), _) => Badge {
                text: "●".to_string(),
                color: Severity::Success.color().to_string(),
                title: Some(Message::TrackingOn(host.clone()).to_string()),
                clear_after_ms: None,
            },
            (_, None) => Badge {
                text: String::new(),
                color: Severity::Info.color().to_string(),
                title: Some(Message::ReadyToTrack.to_string()),
                clear_after_ms: None,
            },
            (_, Some(severity)) => Badge {
                text: severity.badge_text().to_string(),
                color: severity.color().to_string(),
                title: None,
                clear_after_ms: Some(severity.clear_after().as_millis() as u64),
            },
        }
    }
}

pub trait Notifier {
    fn notify(&self, signal: Signal);

    /// Asks the host to open `url` in a new tab.
    fn open_url(&self, _url: &str) {}
}

/// Prints signals for the one-shot CLI commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, signal: Signal) {
        match signal.severity() {
            None => tracing::debug!("{}", signal.message()),
            Some(Severity::Error) => msg_error!(signal.message()),
            Some(Severity::Warning) => msg_warning!(signal.message()),
            Some(Severity::Success) => msg_success!(signal.message()),
            Some(Severity::Sync) | Some(Severity::Info) => msg_info!(signal.message()),
        }
    }
}

/// Forwards signals to the native-host writer as outbound frames.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Outbound>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, signal: Signal) {
        tracing::info!(signal = ?signal, "{}", signal.message());
        if self.tx.send(Outbound::Badge(signal.badge())).is_err() {
            tracing::debug!("badge dropped, host writer is gone");
        }
    }

    fn open_url(&self, url: &str) {
        if self.tx.send(Outbound::OpenUrl { url: url.to_string() }).is_err() {
            tracing::debug!(url, "open-url dropped, host writer is gone");
        }
    }
}
