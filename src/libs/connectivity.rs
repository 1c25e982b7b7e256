//! Online/offline detection.
//!
//! A bounded `HEAD` request against the API base URL. Any HTTP answer, whatever
//! its status, means the network path is up; only transport failures and
//! timeouts count as offline.

use reqwest::Client;
use std::time::Duration;

#[allow(async_fn_in_trait)]
pub trait Connectivity {
    async fn is_online(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            timeout,
        }
    }
}

impl Connectivity for HttpProbe {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).timeout(self.timeout).send().await {
            Ok(response) => {
                tracing::trace!(url = %self.url, status = %response.status(), "connectivity probe answered");
                true
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "connectivity probe failed");
                false
            }
        }
    }
}
