//! Application-level configuration loading: the admin allow-list and identity header.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::auth::DEFAULT_IDENTITY_HEADER;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NEON_COUNTDOWN_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Emails allowed to open an admin session.
    pub admin_emails: Vec<String>,
    /// Header the upstream proxy uses to forward the verified email.
    pub identity_header: String,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to an empty allow-list.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        admins = app_config.admin_emails.len(),
                        header = %app_config.identity_header,
                        "loaded admin configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; nobody can sign in as admin"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    admin_emails: Vec<String>,
    #[serde(default)]
    identity_header: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let identity_header = value
            .identity_header
            .map(|header| header.trim().to_ascii_lowercase())
            .filter(|header| !header.is_empty())
            .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_owned());
        Self {
            admin_emails: value.admin_emails,
            identity_header,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_uses_default() {
        let config = AppConfig::from_json(r#"{"admin_emails": ["gm@neon.example"]}"#).unwrap();
        assert_eq!(config.admin_emails, vec!["gm@neon.example".to_string()]);
        assert_eq!(config.identity_header, DEFAULT_IDENTITY_HEADER);
    }

    #[test]
    fn header_is_normalized() {
        let config = AppConfig::from_json(r#"{"identity_header": " X-Auth-Request-Email "}"#)
            .unwrap();
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.identity_header, "x-auth-request-email");
    }
}
