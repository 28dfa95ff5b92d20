use async_trait::async_trait;
use quiz_core::model::{TestId, TestSummary};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A catalog row that could not be written during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub id: TestId,
    pub reason: String,
}

/// Outcome of one `upsert_all` batch.
///
/// Rows are independent, so a failed row is skipped and the rest of the
/// batch still lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub written: usize,
    pub skipped: Vec<SkippedRow>,
}

impl UpsertReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Local mirror of the remote test catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Create the catalog table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// Replace the cached catalog with `entries` in one ordered batch.
    ///
    /// Rows whose id is not in `entries` are removed; the rest are inserted or
    /// updated by id. Each entry's position in `entries` is stored so a later
    /// `query_all` returns the last written order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the batch itself cannot start or
    /// commit; individual row failures are reported in `UpsertReport::skipped`.
    async fn upsert_all(&self, entries: &[TestSummary]) -> Result<UpsertReport, StorageError>;

    /// Read the whole cached catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or a row is corrupt.
    async fn query_all(&self) -> Result<Vec<TestSummary>, StorageError>;
}

/// Small boolean key/value flags, e.g. the first-run consent marker.
#[async_trait]
pub trait FlagRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be written.
    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Supports failure injection: the whole store can be marked unavailable and
/// single ids can be made to fail on write.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<HashMap<TestId, (usize, TestSummary)>>>,
    flags: Arc<Mutex<HashMap<String, bool>>>,
    rejected: Arc<Mutex<HashSet<TestId>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StorageError::Connection`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make writes of this id fail, as a constraint violation would.
    pub fn reject_writes_for(&self, id: TestId) {
        if let Ok(mut guard) = self.rejected.lock() {
            guard.insert(id);
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        self.check_available()
    }

    async fn upsert_all(&self, entries: &[TestSummary]) -> Result<UpsertReport, StorageError> {
        self.check_available()?;
        let rejected = self
            .rejected
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .clone();
        let mut guard = self
            .catalog
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let listed: HashSet<&TestId> = entries.iter().map(TestSummary::id).collect();
        guard.retain(|id, _| listed.contains(id));

        let mut report = UpsertReport::default();
        for (position, entry) in entries.iter().enumerate() {
            if rejected.contains(entry.id()) {
                tracing::warn!(test_id = %entry.id(), "rejected catalog row, skipping");
                report.skipped.push(SkippedRow {
                    id: entry.id().clone(),
                    reason: "write rejected".into(),
                });
                continue;
            }
            guard.insert(entry.id().clone(), (position, entry.clone()));
            report.written += 1;
        }
        Ok(report)
    }

    async fn query_all(&self) -> Result<Vec<TestSummary>, StorageError> {
        self.check_available()?;
        let guard = self
            .catalog
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<_> = guard.values().cloned().collect();
        rows.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| a.id().cmp(b.id())));
        Ok(rows.into_iter().map(|(_, summary)| summary).collect())
    }
}

#[async_trait]
impl FlagRepository for InMemoryRepository {
    async fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.check_available()?;
        let guard = self
            .flags
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).copied())
    }

    async fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .flags
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub flags: Arc<dyn FlagRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for failure injection.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let flags: Arc<dyn FlagRepository> = Arc::new(repo.clone());
        Self { catalog, flags }
    }
}
