//! Core library modules for dwellsync.
//!
//! ## Layout
//!
//! - **Measurement**: [`hostname`], [`dwell`], [`focus`]
//! - **Reconciliation**: [`queue`], [`sync`], [`auth`], [`connectivity`]
//! - **Engine**: [`engine`] owns all state, [`daemon`] drives it as a native host
//! - **Plumbing**: [`config`], [`data_storage`], [`persistence`], [`secret`],
//!   [`protocol`], [`notify`], [`clock`], [`messages`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dwellsync::api::ScreenTimeClient;
//! use dwellsync::libs::{clock::SystemClock, config::Config, engine::Tracker};
//! use dwellsync::libs::{notify::ConsoleNotifier, persistence::PersistenceLayer};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::read()?;
//! let api = ScreenTimeClient::new(&config.server(), &config.tracker());
//! let mut tracker = Tracker::new(api, SystemClock, ConsoleNotifier, PersistenceLayer::open_default()?, &config);
//! tracker.restore().await;
//! tracker.push().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod daemon;
pub mod data_storage;
pub mod dwell;
pub mod engine;
pub mod focus;
pub mod formatter;
pub mod hostname;
pub mod messages;
pub mod notify;
pub mod persistence;
pub mod protocol;
pub mod queue;
pub mod secret;
pub mod sync;
