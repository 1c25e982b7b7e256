//! Remote screen-time store.
//!
//! The engine talks to the store only through [`ScreenTimeApi`], so the sync
//! logic can be driven by a scripted implementation in tests. The production
//! implementation is [`ScreenTimeClient`].
//!
//! ## Endpoints
//!
//! - `GET /screen-time`: every stored day of the caller
//! - `POST /screen-time`: absolute upsert of one day; the server max-merges
//! - `POST /screen-time/refresh-token`: exchange a refresh token (unauthenticated)
//!
//! ```rust,no_run
//! use dwellsync::api::{ScreenTimeApi, ScreenTimeClient};
//! use dwellsync::libs::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::read()?;
//! let client = ScreenTimeClient::new(&config.server(), &config.tracker());
//! let days = client.fetch_days("access-token").await?;
//! # Ok(())
//! # }
//! ```

use crate::libs::dwell::TabUsage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod screen_time;

pub use screen_time::ScreenTimeClient;

/// Failures talking to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The bearer credential was rejected (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// One day as the remote store exchanges it, and as the offline queue stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    pub total_time: u64,
    #[serde(default)]
    pub tabs: Vec<TabUsage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[allow(async_fn_in_trait)]
pub trait ScreenTimeApi {
    /// Fetches every day the store holds for the token's identity.
    async fn fetch_days(&self, token: &str) -> Result<Vec<DayRecord>, ApiError>;

    /// Upserts the absolute state of one day.
    async fn upsert_day(&self, token: &str, record: &DayRecord) -> Result<(), ApiError>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<String, ApiError>;
}
