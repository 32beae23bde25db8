//! Configuration management for indexwatch using the prefer crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ClientConfig;
use crate::page::DEFAULT_MARKER_CLASS;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Default path of the login form, relative to the server root.
pub const DEFAULT_LOGIN_PATH: &str = "/public/login";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// User agent for HTTP requests (None = default).
    pub user_agent: Option<String>,
    /// Request timeout in seconds (None = wait forever).
    pub request_timeout: Option<u64>,
    /// Delay between polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Class marking indicators fed by the shared endpoint.
    pub marker_class: String,
    /// Shared progress endpoint, absolute or relative to the page URL.
    /// None = `<page-url>/progress`.
    pub progress_path: Option<String>,
    /// Login form path, resolved against the page URL.
    pub login_path: String,
    /// Login user name; login is skipped when unset.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: None,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
            progress_path: None,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            username: None,
            password: None,
        }
    }
}

impl Settings {
    /// Delay between polls, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// HTTP client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout.map(Duration::from_secs),
        }
    }

    /// Credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Delay between polls in milliseconds.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Class marking shared-endpoint indicators.
    #[serde(default)]
    pub marker_class: Option<String>,
    /// Shared progress endpoint.
    #[serde(default)]
    pub progress_path: Option<String>,
    /// Login form path.
    #[serde(default)]
    pub login_path: Option<String>,
    /// Login user name. Passwords stay out of config files; use the
    /// environment or the command line.
    #[serde(default)]
    pub username: Option<String>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers indexwatch config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("indexwatch").await {
            Ok(pref_config) => {
                let user_agent: Option<String> = pref_config.get("user_agent").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let poll_interval_ms: Option<u64> = pref_config.get("poll_interval_ms").ok();
                let marker_class: Option<String> = pref_config.get("marker_class").ok();
                let progress_path: Option<String> = pref_config.get("progress_path").ok();
                let login_path: Option<String> = pref_config.get("login_path").ok();
                let username: Option<String> = pref_config.get("username").ok();

                Config {
                    user_agent,
                    request_timeout,
                    poll_interval_ms,
                    marker_class,
                    progress_path,
                    login_path,
                    username,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = Some(timeout);
        }
        if let Some(interval) = self.poll_interval_ms {
            settings.poll_interval_ms = interval.max(1);
        }
        if let Some(ref class) = self.marker_class {
            settings.marker_class = class.clone();
        }
        if let Some(ref path) = self.progress_path {
            settings.progress_path = Some(path.clone());
        }
        if let Some(ref path) = self.login_path {
            settings.login_path = path.clone();
        }
        if let Some(ref username) = self.username {
            settings.username = Some(username.clone());
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}
