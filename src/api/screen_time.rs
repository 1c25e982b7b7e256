use super::{ApiError, DayRecord, RefreshRequest, RefreshResponse, ScreenTimeApi};
use crate::libs::config::{ServerConfig, TrackerConfig};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

const SCREEN_TIME_URL: &str = "screen-time";
const REFRESH_URL: &str = "screen-time/refresh-token";

/// `reqwest` implementation of [`ScreenTimeApi`].
#[derive(Debug, Clone)]
pub struct ScreenTimeClient {
    client: Client,
    api_url: String,
    request_timeout: Duration,
    refresh_timeout: Duration,
}

impl ScreenTimeClient {
    pub fn new(server: &ServerConfig, tracker: &TrackerConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: server.api_url.trim_end_matches('/').to_string(),
            request_timeout: tracker.request_timeout(),
            refresh_timeout: tracker.refresh_timeout(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }

    fn check(status: StatusCode) -> Result<(), ApiError> {
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status if status.is_success() => Ok(()),
            status => Err(ApiError::Status(status.as_u16())),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl ScreenTimeApi for ScreenTimeClient {
    async fn fetch_days(&self, token: &str) -> Result<Vec<DayRecord>, ApiError> {
        let res = self
            .client
            .get(self.url(SCREEN_TIME_URL))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(res.status())?;
        Ok(res.json::<Vec<DayRecord>>().await?)
    }

    async fn upsert_day(&self, token: &str, record: &DayRecord) -> Result<(), ApiError> {
        let res = self
            .client
            .post(self.url(SCREEN_TIME_URL))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .json(record)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(res.status())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let res = self
            .client
            .post(self.url(REFRESH_URL))
            .json(&RefreshRequest { refresh_token })
            .timeout(self.refresh_timeout)
            .send()
            .await?;
        Self::check(res.status())?;
        let body = res.json::<RefreshResponse>().await?;
        Ok(body.token)
    }
}
