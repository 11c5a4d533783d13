//! Runtime configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

use time::UtcOffset;
use time::macros::format_description;

use crate::services::bill::Letterhead;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "dineboard";
const SESSION_FILE_NAME: &str = "session_token";
const SPOOL_DIR_NAME: &str = "dineboard-bills";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("no {0} directory available; set {1}")]
    MissingDir(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend_url: String,
    pub timeouts: HttpTimeouts,
    pub session_file: PathBuf,
    pub spool_dir: PathBuf,
    pub print_command: Option<String>,
    /// `None` means "use the host's local offset".
    pub utc_offset: Option<UtcOffset>,
    pub letterhead: Letterhead,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `DINEBOARD_BACKEND_URL`: default `http://127.0.0.1:5000/api`
    /// - `DINEBOARD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `DINEBOARD_CONNECT_TIMEOUT_SECS`: default 10
    /// - `DINEBOARD_SESSION_FILE`: default `<config dir>/dineboard/session_token`
    /// - `DINEBOARD_SPOOL_DIR`: default `<temp dir>/dineboard-bills`
    /// - `DINEBOARD_PRINT_COMMAND`: e.g. `lp -d kitchen`, bill path appended; unset means bills are only spooled
    /// - `DINEBOARD_UTC_OFFSET`: e.g. `+05:30`
    /// - `DINEBOARD_RESTAURANT_NAME`, `_ADDRESS`, `_PHONE`, `_EMAIL`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid URL or offset, or when no
    /// config directory exists and no session file is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let backend_url = parse_backend_url(var("DINEBOARD_BACKEND_URL").as_deref())?;
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(var("DINEBOARD_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(var("DINEBOARD_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let session_file = match var("DINEBOARD_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .ok_or(ConfigError::MissingDir("config", "DINEBOARD_SESSION_FILE"))?
                .join(APP_DIR)
                .join(SESSION_FILE_NAME),
        };
        let spool_dir = var("DINEBOARD_SPOOL_DIR").map_or_else(|| std::env::temp_dir().join(SPOOL_DIR_NAME), PathBuf::from);
        let utc_offset = var("DINEBOARD_UTC_OFFSET").as_deref().map(parse_utc_offset).transpose()?;

        let defaults = Letterhead::default();
        let letterhead = Letterhead {
            name: var("DINEBOARD_RESTAURANT_NAME").unwrap_or(defaults.name),
            address: var("DINEBOARD_RESTAURANT_ADDRESS").unwrap_or(defaults.address),
            phone: var("DINEBOARD_RESTAURANT_PHONE").unwrap_or(defaults.phone),
            email: var("DINEBOARD_RESTAURANT_EMAIL").unwrap_or(defaults.email),
        };

        Ok(Self {
            backend_url,
            timeouts,
            session_file,
            spool_dir,
            print_command: var("DINEBOARD_PRINT_COMMAND"),
            utc_offset,
            letterhead,
        })
    }
}

/// Configured offset, else the host's local one, else UTC.
///
/// Call before any other threads exist: the local offset lookup refuses to
/// run in a multi-threaded process on some platforms.
#[must_use]
pub fn resolve_utc_offset(configured: Option<UtcOffset>) -> UtcOffset {
    configured.unwrap_or_else(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
}

/// Validate the scheme and drop trailing slashes so paths can be appended.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] unless the URL is `http://` or `https://`.
pub fn parse_backend_url(raw: Option<&str>) -> Result<String, ConfigError> {
    let url = raw.unwrap_or(DEFAULT_BACKEND_URL).trim().trim_end_matches('/');
    let host = url.strip_prefix("http://").or_else(|| url.strip_prefix("https://"));
    match host {
        Some(rest) if !rest.is_empty() => Ok(url.to_owned()),
        _ => Err(ConfigError::Parse(format!("DINEBOARD_BACKEND_URL must be an http(s) URL, got '{url}'"))),
    }
}

/// Parse `+05:30` / `-08:00` style offsets.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for anything else.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    UtcOffset::parse(raw.trim(), format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
        .map_err(|e| ConfigError::Parse(format!("DINEBOARD_UTC_OFFSET '{raw}': {e}")))
}
