//! Configuration management for dwellsync.
//!
//! Settings live in `config.json` in the platform data directory (see
//! [`DataStorage`]). Both sections are optional; a missing file or a missing
//! section falls back to defaults, so the native host runs with zero setup.
//!
//! ```rust,no_run
//! use dwellsync::libs::config::Config;
//!
//! let config = Config::read()?;
//! let tracker = config.tracker();
//! println!("daily cap: {}s", tracker.daily_cap_secs);
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::msg_print;
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Hosts whose pages count as "media playing" and keep tracking alive while the system is idle.
pub const DEFAULT_MEDIA_HOSTS: [&str; 5] = ["youtube.com", "netflix.com", "vimeo.com", "twitch.tv", "primevideo.com"];

/// A configurable section shown by the setup wizard.
#[derive(Debug, Clone)]
pub struct ConfigModule {
    pub key: String,
    pub name: String,
}

/// Remote endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Base URL of the screen-time API (`/screen-time` is appended).
    pub api_url: String,
    /// Page opened by the `openWebApp` action.
    pub web_app_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".to_string(),
            web_app_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Timing and policy knobs for tracking and synchronization.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Idle detection interval reported to the browser, in seconds.
    pub idle_detection_secs: u64,
    /// Hard cap on tracked seconds per day.
    pub daily_cap_secs: u64,
    /// Push cadence in seconds.
    pub sync_interval_secs: u64,
    /// Pull cadence in seconds.
    pub pull_interval_secs: u64,
    /// Connectivity probe cadence in seconds.
    pub connectivity_poll_secs: u64,
    /// Timeout for screen-time requests, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for token refresh requests, in seconds.
    pub refresh_timeout_secs: u64,
    /// Attempts per snapshot before it stays queued.
    pub max_attempts: u32,
    /// Push backoff: attempt number times this many milliseconds.
    pub backoff_base_ms: u64,
    /// Pull backoff: attempt number times this many milliseconds.
    pub pull_backoff_base_ms: u64,
    /// How long before token expiry the proactive refresh fires, in seconds.
    pub refresh_lead_secs: u64,
    pub media_hosts: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_detection_secs: 15,
            daily_cap_secs: 86_400,
            sync_interval_secs: 300,
            pull_interval_secs: 300,
            connectivity_poll_secs: 5,
            request_timeout_secs: 20,
            refresh_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 2_000,
            pull_backoff_base_ms: 1_000,
            refresh_lead_secs: 60,
            media_hosts: DEFAULT_MEDIA_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl TrackerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerConfig>,
}

impl Config {
    /// Loads the configuration file, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn read() -> Result<Config> {
        Self::read_from(&DataStorage::new())
    }

    pub fn read_from(storage: &DataStorage) -> Result<Config> {
        let config_file_path = storage.get_path(CONFIG_FILE_NAME)?;
        if !config_file_path.exists() {
            return Ok(Config::default());
        }
        let config_str = fs::read_to_string(config_file_path)?;
        Ok(serde_json::from_str(&config_str)?)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self) -> Result<()> {
        self.save_to(&DataStorage::new())
    }

    pub fn save_to(&self, storage: &DataStorage) -> Result<()> {
        let config_file = File::create(storage.get_path(CONFIG_FILE_NAME)?)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn tracker(&self) -> TrackerConfig {
        self.tracker.clone().unwrap_or_default()
    }

    /// Interactive setup wizard, seeded with the current values.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();

        let modules = [
            ConfigModule {
                key: "server".to_string(),
                name: "Server".to_string(),
            },
            ConfigModule {
                key: "tracker".to_string(),
                name: "Tracker".to_string(),
            },
        ];

        let selected = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptSelectModules.to_string())
            .items(&modules.iter().map(|module| &module.name).collect::<Vec<_>>())
            .interact()?;

        for &selection in &selected {
            match modules[selection].key.as_str() {
                "server" => {
                    let default = config.server();
                    msg_print!(Message::ConfigModuleServer);
                    config.server = Some(ServerConfig {
                        api_url: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptApiUrl.to_string())
                            .default(default.api_url)
                            .interact_text()?,
                        web_app_url: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptWebAppUrl.to_string())
                            .default(default.web_app_url)
                            .interact_text()?,
                    });
                }
                "tracker" => {
                    let default = config.tracker();
                    msg_print!(Message::ConfigModuleTracker);
                    let media_hosts: String = Input::with_theme(&ColorfulTheme::default())
                        .with_prompt(Message::PromptMediaHosts.to_string())
                        .default(default.media_hosts.join(","))
                        .interact_text()?;
                    config.tracker = Some(TrackerConfig {
                        idle_detection_secs: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptIdleDetection.to_string())
                            .default(default.idle_detection_secs)
                            .interact_text()?,
                        daily_cap_secs: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptDailyCap.to_string())
                            .default(default.daily_cap_secs)
                            .interact_text()?,
                        sync_interval_secs: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptSyncInterval.to_string())
                            .default(default.sync_interval_secs)
                            .interact_text()?,
                        pull_interval_secs: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptPullInterval.to_string())
                            .default(default.pull_interval_secs)
                            .interact_text()?,
                        request_timeout_secs: Input::with_theme(&ColorfulTheme::default())
                            .with_prompt(Message::PromptRequestTimeout.to_string())
                            .default(default.request_timeout_secs)
                            .interact_text()?,
                        media_hosts: media_hosts
                            .split(',')
                            .map(|host| host.trim().to_lowercase())
                            .filter(|host| !host.is_empty())
                            .collect(),
                        ..default
                    });
                }
                _ => {}
            }
        }

        Ok(config)
    }
}
