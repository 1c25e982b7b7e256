//! Display implementation for dwellsync messages.
//!
//! The single place where message text is written. Badge titles, CLI output
//! and log lines all format a [`Message`] through this impl.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigDeleted => "Configuration removed".to_string(),
            Message::ConfigModuleServer => "Server settings".to_string(),
            Message::ConfigModuleTracker => "Tracker settings".to_string(),
            Message::PromptSelectModules => "Select modules to configure".to_string(),
            Message::PromptApiUrl => "Enter the screen-time API URL".to_string(),
            Message::PromptWebAppUrl => "Enter the web app URL".to_string(),
            Message::PromptIdleDetection => "Idle detection interval (seconds)".to_string(),
            Message::PromptDailyCap => "Daily cap (seconds)".to_string(),
            Message::PromptSyncInterval => "Push interval (seconds)".to_string(),
            Message::PromptPullInterval => "Pull interval (seconds)".to_string(),
            Message::PromptRequestTimeout => "Request timeout (seconds)".to_string(),
            Message::PromptMediaHosts => "Streaming hosts that keep tracking while idle (comma separated)".to_string(),
            Message::PromptAccessToken => "Access token".to_string(),

            // === AUTHENTICATION MESSAGES ===
            Message::LoggedIn => "Credentials stored".to_string(),
            Message::LoggedOut => "Logged out successfully".to_string(),
            Message::LoginRequired => "Login required for sync".to_string(),
            Message::SessionExpired => "Session expired - please login".to_string(),
            Message::TokenUndecodable => "Access token could not be decoded".to_string(),

            // === TRACKING MESSAGES ===
            Message::Ready => "Ready!".to_string(),
            Message::Started => "Started".to_string(),
            Message::TrackingOn(hostname) => format!("Tracking: {}", hostname),
            Message::ReadyToTrack => "Ready to track".to_string(),
            Message::TrackingResumed => "Tracking resumed".to_string(),
            Message::TrackingRestored => "Tracking restored".to_string(),
            Message::PausedNoFocus => "Paused - browser not focused".to_string(),
            Message::PausedSystemIdle => "Paused - system idle or locked".to_string(),
            Message::ResumedTracking => "Resumed tracking".to_string(),
            Message::DailyLimitReached => "Daily time limit reached".to_string(),
            Message::NewDay(date) => format!("New day ({}) - data reset", date),

            // === SYNC MESSAGES ===
            Message::Syncing => "Syncing...".to_string(),
            Message::Synced => "Synced!".to_string(),
            Message::LoadingData => "Loading data...".to_string(),
            Message::DataLoaded => "Data loaded".to_string(),
            Message::QueuedLocally => "Sync failed - data queued locally".to_string(),
            Message::SyncTimeoutQueued => "Sync timeout - data queued".to_string(),
            Message::OfflineOrIdleQueued => "Offline or idle (no media) - data queued".to_string(),
            Message::WorkingOffline => "Working offline".to_string(),
            Message::ServerSlowUsingLocal => "Server slow - using local data".to_string(),
            Message::UsingLocalData => "Using local data".to_string(),
            Message::BackOnline => "Back online!".to_string(),
            Message::StorageUnavailable(error) => format!("Local storage unavailable: {}", error),

            // === STATS MESSAGES ===
            Message::StatsHeader(date) => format!("Screen time for {}", date),
            Message::NoStatsForToday => "Nothing tracked today yet".to_string(),
            Message::StatsTotal(duration) => format!("Total: {}", duration),
            Message::QueuedDays(count) => format!("{} day(s) waiting to be synced", count),
            Message::DataReset => "Day rolled over, counters reset".to_string(),
            Message::SyncFinished => "Sync finished".to_string(),

            // === WATCHER MESSAGES ===
            Message::WatcherStarted(dir) => format!("Native host started, data in {}", dir),
            Message::WatcherReceivedSigterm => "Received SIGTERM, flushing state".to_string(),
            Message::WatcherReceivedSigint => "Received SIGINT, flushing state".to_string(),
            Message::WatcherReceivedCtrlC => "Received Ctrl+C, flushing state".to_string(),
            Message::WatcherCtrlCListenFailed(error) => format!("Failed to listen for Ctrl+C: {}", error),
            Message::WatcherSignalHandlingNotSupported => "Signal handling is not supported on this platform".to_string(),
            Message::HostDisconnected => "Browser closed the native messaging port".to_string(),
            Message::MalformedFrame(error) => format!("Skipping malformed frame: {}", error),
            Message::EngineExitedNormally => "Engine exited normally".to_string(),
            Message::EngineShuttingDown => "Engine shutting down".to_string(),
            Message::EngineError(error) => format!("Engine error: {}", error),
            Message::EngineTaskPanicked(error) => format!("Engine task panicked: {}", error),
            Message::FailedToCreateSigtermHandler => "Failed to create SIGTERM handler".to_string(),
            Message::FailedToCreateSigintHandler => "Failed to create SIGINT handler".to_string(),
        };
        write!(f, "{}", text)
    }
}
