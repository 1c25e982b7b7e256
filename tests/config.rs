#[cfg(test)]
mod tests {
    use dwellsync::libs::config::{Config, ServerConfig, TrackerConfig, CONFIG_FILE_NAME};
    use dwellsync::libs::data_storage::DataStorage;
    use std::fs;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    /// Points the data directory at a temporary home for each test.
    struct ConfigTestContext {
        temp_dir: TempDir,
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            std::env::set_var("HOME", temp_dir.path());
            std::env::set_var("LOCALAPPDATA", temp_dir.path());
            ConfigTestContext { temp_dir }
        }
    }

    impl ConfigTestContext {
        fn storage(&self) -> DataStorage {
            DataStorage::at(self.temp_dir.path().join("data"))
        }
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_missing_file_yields_defaults(ctx: &mut ConfigTestContext) {
        let config = Config::read_from(&ctx.storage()).unwrap();
        assert_eq!(config, Config::default());

        let tracker = config.tracker();
        assert_eq!(tracker.daily_cap_secs, 86_400);
        assert_eq!(tracker.max_attempts, 3);
        assert_eq!(tracker.backoff_base_ms, 2_000);
        assert!(tracker.media_hosts.contains(&"youtube.com".to_string()));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_save_and_read_config(ctx: &mut ConfigTestContext) {
        let config = Config {
            server: Some(ServerConfig {
                api_url: "https://api.example.com".to_string(),
                web_app_url: "https://app.example.com".to_string(),
            }),
            tracker: Some(TrackerConfig {
                sync_interval_secs: 60,
                media_hosts: vec!["vimeo.com".to_string()],
                ..TrackerConfig::default()
            }),
        };

        config.save_to(&ctx.storage()).unwrap();

        assert_eq!(Config::read_from(&ctx.storage()).unwrap(), config);
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_partial_tracker_section_fills_defaults(ctx: &mut ConfigTestContext) {
        let storage = ctx.storage();
        fs::write(
            storage.get_path(CONFIG_FILE_NAME).unwrap(),
            r#"{"tracker": {"daily_cap_secs": 3600}}"#,
        )
        .unwrap();

        let config = Config::read_from(&storage).unwrap();

        assert_eq!(config.tracker().daily_cap_secs, 3600);
        assert_eq!(config.tracker().pull_interval_secs, 300);
        assert_eq!(config.server(), ServerConfig::default());
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_malformed_file_is_an_error(ctx: &mut ConfigTestContext) {
        let storage = ctx.storage();
        fs::write(storage.get_path(CONFIG_FILE_NAME).unwrap(), "{ broken").unwrap();
        assert!(Config::read_from(&storage).is_err());
    }
}
