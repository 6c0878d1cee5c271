use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::persistent_list::DEFAULT_RECENT_LIMIT;

/// Terminal client for a remote script catalog.
#[derive(Parser, Debug, Clone)]
#[command(name = "tymbr", version)]
pub struct Settings {
    /// Base URL of the script server
    #[arg(long, env = "TYMBR_SERVER", default_value = "http://127.0.0.1:5000")]
    pub server: Url,

    /// Directory holding recent and favorite script lists
    #[arg(long, env = "TYMBR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for log files (defaults to <data-dir>/logs)
    #[arg(long, env = "TYMBR_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "TYMBR_LOG", default_value = "info")]
    pub log_level: String,

    /// Number of recently used scripts to remember
    #[arg(long, env = "TYMBR_RECENT_LIMIT", default_value_t = DEFAULT_RECENT_LIMIT)]
    pub recent_limit: usize,

    /// Per-request timeout in seconds; requests never time out when unset
    #[arg(long, env = "TYMBR_TIMEOUT")]
    pub request_timeout_secs: Option<u64>,

    /// UI tick interval in milliseconds
    #[arg(long, default_value_t = 250)]
    pub tick_ms: u64,
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("tymbr")
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("logs"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "tymbr",
            "--server",
            "http://scripts.internal:8080",
            "--data-dir",
            "/tmp/tymbr-test",
            "--recent-limit",
            "8",
            "--request-timeout-secs",
            "30",
        ])
        .unwrap();
        assert_eq!(settings.server.as_str(), "http://scripts.internal:8080/");
        assert_eq!(settings.data_dir(), PathBuf::from("/tmp/tymbr-test"));
        assert_eq!(settings.log_dir(), PathBuf::from("/tmp/tymbr-test/logs"));
        assert_eq!(settings.recent_limit, 8);
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        assert!(Settings::try_parse_from(["tymbr", "--server", "not a url"]).is_err());
    }
}
