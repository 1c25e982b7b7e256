//! # Dwellsync - per-website dwell time tracking and synchronization
//!
//! Measures how long each website stays focused in the browser, keeps the
//! running totals durable across restarts, and reconciles them with a remote
//! screen-time store that may be unreachable for long stretches.
//!
//! ## Features
//!
//! - **Dwell Measurement**: Second-resolution accounting per hostname, capped at one day
//! - **Focus Tracking**: Window focus, active tab, idle/lock and media playback
//! - **Offline Queue**: Unsynced days survive restarts and are pushed once back online
//! - **Session Handling**: Access token expiry detection and refresh-token exchange
//! - **Native Host**: Length-prefixed JSON frames over stdin/stdout for the browser shim
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dwellsync::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod api;
pub mod commands;
pub mod db;
pub mod libs;
