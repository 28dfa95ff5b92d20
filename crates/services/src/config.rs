use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://tgryl.pl/";
pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_NICK: &str = "player";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RESULTS_LIMIT: u32 = 30;

/// Countdown step for a question.
pub const TICK: Duration = Duration::from_secs(1);
/// Pause after an answer (or timeout) before moving on.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(1500);

/// Timer settings for a quiz session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTimings {
    pub tick: Duration,
    pub feedback_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            tick: TICK,
            feedback_delay: FEEDBACK_DELAY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizConfig {
    pub api_base_url: Url,
    pub database_url: String,
    pub nick: String,
    pub http_timeout: Duration,
    pub results_limit: u32,
    pub timings: SessionTimings,
}

impl QuizConfig {
    /// Built-in settings, with no environment applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the built-in service URL does not parse.
    pub fn defaults() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(DEFAULT_API_BASE_URL)?,
            database_url: DEFAULT_DB_URL.into(),
            nick: DEFAULT_NICK.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            results_limit: DEFAULT_RESULTS_LIMIT,
            timings: SessionTimings::default(),
        })
    }

    /// Read `QUIZ_*` environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;

        if let Some(raw) = non_empty(lookup("QUIZ_API_BASE_URL")) {
            config.api_base_url = parse_base_url(&raw)?;
        }
        if let Some(raw) = non_empty(lookup("QUIZ_DB_URL")) {
            config.database_url = raw;
        }
        if let Some(raw) = non_empty(lookup("QUIZ_NICK")) {
            config.nick = raw;
        }
        if let Some(raw) = non_empty(lookup("QUIZ_HTTP_TIMEOUT_SECS")) {
            let secs: u64 = raw
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "QUIZ_HTTP_TIMEOUT_SECS",
                    raw: raw.clone(),
                })?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = non_empty(lookup("QUIZ_RESULTS_LIMIT")) {
            config.results_limit = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "QUIZ_RESULTS_LIMIT",
                raw: raw.clone(),
            })?;
        }

        Ok(config)
    }
}

/// Parse the service root, making sure relative endpoint joins stay under it.
///
/// # Errors
///
/// Returns `ConfigError::InvalidUrl` for unparsable or non-http(s) URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|err| ConfigError::InvalidUrl {
        raw: raw.to_owned(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            raw: raw.to_owned(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
