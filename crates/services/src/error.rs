//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::SessionStateError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failure of a call to the remote quiz service.
///
/// `Clone` so the last load failure can travel inside published engine snapshots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("no network connection")]
    Offline,
    #[error("request timed out")]
    Timeout,
    #[error("remote service answered with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Error taxonomy of the quiz core: remote, local store, or state machine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    State(#[from] SessionStateError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid {var} value: {raw}")]
    InvalidValue { var: &'static str, raw: String },
    #[error("invalid api base url {raw}: {reason}")]
    InvalidUrl { raw: String, reason: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
