use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TestId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestSummaryError {
    #[error("test id cannot be empty")]
    EmptyId,

    #[error("test name cannot be empty")]
    EmptyName,
}

//
// ─── TEST SUMMARY ─────────────────────────────────────────────────────────────
//

/// Catalog entry describing one test the user can attempt.
///
/// Summaries are immutable once fetched; two summaries describe the same test
/// when their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    id: TestId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    number_of_tasks: u32,
}

impl TestSummary {
    /// Build a summary, trimming the display fields.
    ///
    /// # Errors
    ///
    /// Returns `TestSummaryError` when the id or name is blank.
    pub fn new(
        id: TestId,
        name: impl Into<String>,
        description: impl Into<String>,
        level: impl Into<String>,
        number_of_tasks: u32,
    ) -> Result<Self, TestSummaryError> {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            level: level.into(),
            number_of_tasks,
        }
        .validate()
    }

    /// Check and normalise a summary decoded from the wire.
    ///
    /// Display fields come back trimmed, so a validated summary survives a
    /// trip through the local cache unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TestSummaryError` when the id or name is blank.
    pub fn validate(mut self) -> Result<Self, TestSummaryError> {
        if self.id.is_blank() {
            return Err(TestSummaryError::EmptyId);
        }
        trim_in_place(&mut self.name);
        trim_in_place(&mut self.description);
        trim_in_place(&mut self.level);
        if self.name.is_empty() {
            return Err(TestSummaryError::EmptyName);
        }
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    #[must_use]
    pub fn number_of_tasks(&self) -> u32 {
        self.number_of_tasks
    }
}

fn trim_in_place(field: &mut String) {
    let trimmed = field.trim();
    if trimmed.len() != field.len() {
        *field = trimmed.to_owned();
    }
}
