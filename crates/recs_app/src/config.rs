//! RON configuration file for the `recs` binary.
//!
//! Every field is optional; missing fields fall back to the engine defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use recs_core::PollPolicy;
use recs_engine::{ClientSettings, EnvToken};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "recs.ron";
pub const DEFAULT_TOKEN_ENV: &str = "RECS_API_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub initial_delay_ms: Option<u64>,
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_step_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: Option<String>,
    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_result_bytes: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub poll: PollConfig,
}

impl AppConfig {
    /// File to read: `explicit` if given, else `./recs.ron` when it exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                path.is_file().then_some(path)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            connect_timeout: millis_or(self.connect_timeout_ms, defaults.connect_timeout),
            request_timeout: millis_or(self.request_timeout_ms, defaults.request_timeout),
            max_result_bytes: self.max_result_bytes.unwrap_or(defaults.max_result_bytes),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        let poll = &self.poll;
        PollPolicy {
            initial_delay: millis_or(poll.initial_delay_ms, defaults.initial_delay),
            interval: millis_or(poll.interval_ms, defaults.interval),
            max_attempts: poll.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            backoff_step: millis_or(poll.backoff_step_ms, defaults.backoff_step),
            max_interval: millis_or(poll.max_interval_ms, defaults.max_interval),
        }
    }

    pub fn token_provider(&self) -> EnvToken {
        EnvToken::new(
            self.token_env
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
        )
    }
}

fn millis_or(value: Option<u64>, default: Duration) -> Duration {
    value.map(Duration::from_millis).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_engine_defaults() {
        let config = AppConfig::parse("(base_url: None)").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.poll_policy(), PollPolicy::default());
        assert_eq!(config.client_settings().base_url, "http://localhost:8000");
        assert_eq!(config.token_provider().var(), DEFAULT_TOKEN_ENV);
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let config = AppConfig::parse(
            r#"(
                base_url: Some("https://api.example.com"),
                token_env: Some("MY_TOKEN"),
                request_timeout_ms: Some(1500),
                poll: (interval_ms: Some(1000), max_attempts: Some(3)),
            )"#,
        )
        .unwrap();

        let settings = config.client_settings();
        assert_eq!(settings.base_url, "https://api.example.com");
        assert_eq!(settings.request_timeout, Duration::from_millis(1500));
        assert_eq!(settings.connect_timeout, ClientSettings::default().connect_timeout);

        let policy = config.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, PollPolicy::default().initial_delay);
        assert_eq!(config.token_provider().var(), "MY_TOKEN");
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let config = AppConfig::parse("(poll: (max_attempts: Some(0)))").unwrap();
        assert_eq!(config.poll_policy().max_attempts, 1);
    }

    #[test]
    fn loads_explicit_file_and_reports_bad_ones() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.ron");
        fs::write(&good, r#"(base_url: Some("http://127.0.0.1:9000"))"#).unwrap();
        let config = AppConfig::from_file(&good).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:9000"));

        let bad = temp.path().join("bad.ron");
        fs::write(&bad, "(base_url: 12").unwrap();
        assert!(matches!(
            AppConfig::from_file(&bad),
            Err(ConfigError::Parse { .. })
        ));

        assert_eq!(AppConfig::locate(Some(bad.as_path())), Some(bad.clone()));

        let missing = temp.path().join("missing.ron");
        assert!(matches!(
            AppConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
