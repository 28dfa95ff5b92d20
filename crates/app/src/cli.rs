use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use services::config::parse_base_url;
use services::{ConfigError, QuizConfig};

/// Offline-capable quiz client.
#[derive(Parser, Debug)]
#[command(name = "quiz", version)]
pub struct Cli {
    /// `SQLite` database URL or path (overrides QUIZ_DB_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub db: Option<String>,

    /// Quiz service base URL (overrides QUIZ_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api: Option<String>,

    /// Nick attached to submitted results (overrides QUIZ_NICK)
    #[arg(long, global = true)]
    pub nick: Option<String>,

    /// Behave as if there were no network connection
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the available tests (remote, or cached when offline)
    Catalog,
    /// Play a randomly chosen test
    Random,
    /// Play the test with the given id
    Play {
        #[arg(value_name = "TEST_ID")]
        test_id: String,
    },
    /// Show the most recent results
    Results {
        /// How many results to fetch
        #[arg(long)]
        last: Option<u32>,
    },
    /// Accept the terms of use
    AcceptTerms,
}

impl Cli {
    /// Layer command line flags over a config read from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid `--api` or an empty `--db`.
    pub fn apply(&self, config: &mut QuizConfig) -> Result<(), ConfigError> {
        if let Some(raw) = &self.api {
            config.api_base_url = parse_base_url(raw)?;
        }
        if let Some(raw) = &self.db {
            if raw.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "--db",
                    raw: raw.clone(),
                });
            }
            config.database_url = normalize_sqlite_url(raw);
        }
        if let Some(nick) = &self.nick {
            let nick = nick.trim();
            if nick.is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "--nick",
                    raw: nick.to_owned(),
                });
            }
            config.nick = nick.to_owned();
        }
        Ok(())
    }
}

/// Turn a bare or relative path into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the directory holding a file-backed database exists.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn prepare_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Ok(());
    }
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
