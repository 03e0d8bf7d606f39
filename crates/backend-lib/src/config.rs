// ============================
// dropmate-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Values come from an optional `dropmate.toml` and then the process
//! environment (which wins). Keys match the environment variable names,
//! lowercased in the file.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use dropmate_common::DEFAULT_LOCKER_ID;

pub const CONFIG_FILE: &str = "dropmate.toml";
pub const DEFAULT_PORT: u16 = 3000;

/// Environment keys this service reads.
const ENV_KEYS: &[&str] = &[
    "PORT",
    "BASE_URL",
    "LINE_CHANNEL_ACCESS_TOKEN",
    "OWNER_USER_ID",
    "DEFAULT_LOCKER_ID",
    "DOOR_AUTO_CLOSE_SECS",
    "LOG_FORMAT",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("BASE_URL must be an absolute http(s) URL, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("unknown LOG_FORMAT {0:?} (expected pretty or json)")]
    InvalidLogFormat(String),

    #[error(transparent)]
    Extract(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(Box::new(err))
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Shape of the raw sources; everything optional so missing keys can be
/// reported together.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    port: Option<u16>,
    base_url: Option<String>,
    line_channel_access_token: Option<String>,
    owner_user_id: Option<String>,
    default_locker_id: Option<String>,
    door_auto_close_secs: Option<u64>,
    log_format: Option<String>,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listen port
    pub port: u16,
    /// Externally reachable base used in links sent to the owner
    pub base_url: Url,
    /// Messaging platform channel token
    pub line_channel_access_token: String,
    /// The single identity allowed to run owner commands
    pub owner_user_id: String,
    /// Locker used when none is named
    pub default_locker_id: String,
    /// Re-close the door this long after an unlock; off when `None`
    pub door_auto_close: Option<Duration>,
    /// Log output style
    pub log_format: LogFormat,
}

impl Settings {
    /// Load from `dropmate.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&base_figment())
    }

    /// Build settings from any figment; used by `load` and by tests.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawSettings = figment.extract()?;

        let mut missing = Vec::new();
        let base_url = non_empty(raw.base_url, "BASE_URL", &mut missing);
        let token = non_empty(
            raw.line_channel_access_token,
            "LINE_CHANNEL_ACCESS_TOKEN",
            &mut missing,
        );
        let owner = non_empty(raw.owner_user_id, "OWNER_USER_ID", &mut missing);
        let (Some(base_url), Some(line_channel_access_token), Some(owner_user_id)) =
            (base_url, token, owner)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let base_url = parse_base_url(&base_url)?;
        let log_format = match raw.log_format.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        };

        Ok(Self {
            port: raw.port.unwrap_or(DEFAULT_PORT),
            base_url,
            line_channel_access_token,
            owner_user_id,
            default_locker_id: raw
                .default_locker_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOCKER_ID.to_string()),
            door_auto_close: raw
                .door_auto_close_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// `BASE_URL` without a trailing slash, for log lines.
    pub fn public_base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// Settings for the rich-menu tool, which only talks to the platform.
#[derive(Debug, Clone)]
pub struct RichMenuSettings {
    pub line_channel_access_token: String,
    pub default_locker_id: String,
}

impl RichMenuSettings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&base_figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawSettings = figment.extract()?;
        let mut missing = Vec::new();
        let Some(line_channel_access_token) =
            non_empty(raw.line_channel_access_token, "LINE_CHANNEL_ACCESS_TOKEN", &mut missing)
        else {
            return Err(ConfigError::Missing(missing));
        };
        Ok(Self {
            line_channel_access_token,
            default_locker_id: raw
                .default_locker_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOCKER_ID.to_string()),
        })
    }
}

fn base_figment() -> Figment {
    Figment::new()
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::raw().only(ENV_KEYS))
}

fn non_empty(
    value: Option<String>,
    key: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            missing.push(key);
            None
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figment(toml: &str) -> Figment {
        Figment::new().merge(Toml::string(toml))
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_figment(&figment(
            r#"
            port = 8080
            base_url = "https://locker.example.test"
            line_channel_access_token = "token"
            owner_user_id = "Uowner"
            default_locker_id = "FRONT"
            door_auto_close_secs = 10
            log_format = "JSON"
            "#,
        ))
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.public_base(), "https://locker.example.test");
        assert_eq!(settings.owner_user_id, "Uowner");
        assert_eq!(settings.default_locker_id, "FRONT");
        assert_eq!(settings.door_auto_close, Some(Duration::from_secs(10)));
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.bind_addr().port(), 8080);
    }

    #[test]
    fn test_defaults_for_optional_keys() {
        let settings = Settings::from_figment(&figment(
            r#"
            base_url = "http://localhost:3000/"
            line_channel_access_token = "token"
            owner_user_id = "Uowner"
            "#,
        ))
        .unwrap();

        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.default_locker_id, DEFAULT_LOCKER_ID);
        assert_eq!(settings.door_auto_close, None);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.public_base(), "http://localhost:3000");
    }

    #[test]
    fn test_missing_required_keys_are_all_reported() {
        let err = Settings::from_figment(&figment(r#"owner_user_id = "  ""#)).unwrap_err();
        match err {
            ConfigError::Missing(keys) => {
                assert_eq!(keys, vec!["BASE_URL", "LINE_CHANNEL_ACCESS_TOKEN", "OWNER_USER_ID"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_url_must_be_http() {
        let err = Settings::from_figment(&figment(
            r#"
            base_url = "mailto:owner@example.test"
            line_channel_access_token = "token"
            owner_user_id = "Uowner"
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_rich_menu_needs_only_the_token() {
        let settings =
            RichMenuSettings::from_figment(&figment(r#"line_channel_access_token = "t""#))
                .unwrap();
        assert_eq!(settings.line_channel_access_token, "t");
        assert_eq!(settings.default_locker_id, DEFAULT_LOCKER_ID);

        let err = RichMenuSettings::from_figment(&figment("")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }
}
