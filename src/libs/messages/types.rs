/// Every user-facing string dwellsync can produce.
///
/// Text lives in the `Display` impl in `display.rs`; call sites only pick a
/// variant, so wording stays consistent between the CLI, the logs and the
/// badge titles sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigDeleted,
    ConfigModuleServer,
    ConfigModuleTracker,
    PromptSelectModules,
    PromptApiUrl,
    PromptWebAppUrl,
    PromptIdleDetection,
    PromptDailyCap,
    PromptSyncInterval,
    PromptPullInterval,
    PromptRequestTimeout,
    PromptMediaHosts,
    PromptAccessToken,

    // === AUTHENTICATION MESSAGES ===
    LoggedIn,
    LoggedOut,
    LoginRequired,
    SessionExpired,
    TokenUndecodable,

    // === TRACKING MESSAGES ===
    Ready,
    Started,
    TrackingOn(String), // hostname
    ReadyToTrack,
    TrackingResumed,
    TrackingRestored,
    PausedNoFocus,
    PausedSystemIdle,
    ResumedTracking,
    DailyLimitReached,
    NewDay(String), // date

    // === SYNC MESSAGES ===
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
    StorageUnavailable(String), // error

    // === STATS MESSAGES ===
    StatsHeader(String), // date
    NoStatsForToday,
    StatsTotal(String), // formatted duration
    QueuedDays(usize),
    DataReset,
    SyncFinished,

    // === WATCHER MESSAGES ===
    WatcherStarted(String), // data directory
    WatcherReceivedSigterm,
    WatcherReceivedSigint,
    WatcherReceivedCtrlC,
    WatcherCtrlCListenFailed(String),
    WatcherSignalHandlingNotSupported,
    HostDisconnected,
    MalformedFrame(String), // error
    EngineExitedNormally,
    EngineShuttingDown,
    EngineError(String),
    EngineTaskPanicked(String),
    FailedToCreateSigtermHandler,
    FailedToCreateSigintHandler,
}
