use std::sync::Arc;

use storage::repository::{FlagRepository, StorageError};

/// Flag key recording that the user accepted the terms on first run.
pub const CONSENT_FLAG: &str = "first_run_consent";

#[derive(Clone)]
pub struct ConsentService {
    flags: Arc<dyn FlagRepository>,
}

impl ConsentService {
    #[must_use]
    pub fn new(flags: Arc<dyn FlagRepository>) -> Self {
        Self { flags }
    }

    /// Whether the terms were accepted; a missing flag means not yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    pub async fn is_granted(&self) -> Result<bool, StorageError> {
        Ok(self.flags.get_flag(CONSENT_FLAG).await?.unwrap_or(false))
    }

    /// Persist acceptance of the terms.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be written.
    pub async fn grant(&self) -> Result<(), StorageError> {
        self.flags.set_flag(CONSENT_FLAG, true).await?;
        tracing::info!("first-run consent granted");
        Ok(())
    }
}
