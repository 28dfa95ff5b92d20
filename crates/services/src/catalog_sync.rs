use std::sync::{Arc, Mutex};

use quiz_core::model::TestSummary;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use storage::repository::CatalogRepository;

use crate::connectivity::ConnectivityMonitor;
use crate::error::{NetworkError, QuizError};
use crate::remote::QuizApi;

/// Where the entries of a [`CatalogSnapshot`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// Freshly fetched (and shuffled) from the remote service.
    Remote,
    /// Read back from the local cache after the remote path was unavailable.
    Cache,
    /// Neither source produced anything.
    Unavailable,
}

/// Result of one catalog sync. Never an error: problems are listed in `issues`.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub tests: Vec<TestSummary>,
    pub origin: CatalogOrigin,
    pub issues: Vec<QuizError>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// Keeps the local catalog cache in step with the remote service.
pub struct CatalogSyncManager {
    api: Arc<dyn QuizApi>,
    store: Arc<dyn CatalogRepository>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    rng: Mutex<StdRng>,
}

impl CatalogSyncManager {
    #[must_use]
    pub fn new(
        api: Arc<dyn QuizApi>,
        store: Arc<dyn CatalogRepository>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            api,
            store,
            connectivity,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a fixed seed for the presentation shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Fetch the catalog, preferring the remote service and falling back to the cache.
    ///
    /// Online: the remote list is shuffled, written through to the cache and
    /// returned as fetched. Offline, or when the request fails mid-flight: the
    /// cached rows are returned verbatim.
    pub async fn fetch_catalog(&self) -> CatalogSnapshot {
        let fallback_reason = if self.connectivity.current() {
            match self.api.fetch_catalog().await {
                Ok(tests) => return self.accept_remote(tests).await,
                Err(err) => {
                    tracing::warn!(error = %err, "remote catalog fetch failed, using cache");
                    err
                }
            }
        } else {
            tracing::info!("offline, reading catalog from cache");
            NetworkError::Offline
        };

        self.read_cache(fallback_reason).await
    }

    async fn accept_remote(&self, mut tests: Vec<TestSummary>) -> CatalogSnapshot {
        self.shuffle(&mut tests);
        self.write_through(&tests).await;
        tracing::info!(count = tests.len(), "catalog synced from remote");
        CatalogSnapshot {
            tests,
            origin: CatalogOrigin::Remote,
            issues: Vec::new(),
        }
    }

    async fn write_through(&self, tests: &[TestSummary]) {
        if let Err(err) = self.store.ensure_schema().await {
            tracing::warn!(error = %err, "catalog cache unavailable, skipping write-through");
            return;
        }
        match self.store.upsert_all(tests).await {
            Ok(report) if report.is_complete() => {
                tracing::debug!(written = report.written, "catalog cached");
            }
            Ok(report) => {
                tracing::warn!(
                    written = report.written,
                    skipped = report.skipped.len(),
                    "catalog cached with skipped rows"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "catalog write-through failed");
            }
        }
    }

    async fn read_cache(&self, reason: NetworkError) -> CatalogSnapshot {
        match self.store.query_all().await {
            Ok(tests) if !tests.is_empty() => {
                tracing::info!(count = tests.len(), "catalog served from cache");
                CatalogSnapshot {
                    tests,
                    origin: CatalogOrigin::Cache,
                    issues: Vec::new(),
                }
            }
            Ok(_) => {
                tracing::warn!(reason = %reason, "no catalog available: cache is empty");
                CatalogSnapshot {
                    tests: Vec::new(),
                    origin: CatalogOrigin::Unavailable,
                    issues: vec![QuizError::Network(reason)],
                }
            }
            Err(err) => {
                tracing::warn!(reason = %reason, error = %err, "no catalog available: cache unreadable");
                CatalogSnapshot {
                    tests: Vec::new(),
                    origin: CatalogOrigin::Unavailable,
                    issues: vec![QuizError::Network(reason), QuizError::Storage(err)],
                }
            }
        }
    }

    fn shuffle(&self, tests: &mut [TestSummary]) {
        match self.rng.lock() {
            Ok(mut rng) => tests.shuffle(&mut *rng),
            Err(_) => tests.shuffle(&mut rand::rng()),
        }
    }

    /// Pick one test uniformly at random, e.g. for a "random test" shortcut.
    #[must_use]
    pub fn random_test(&self, tests: &[TestSummary]) -> Option<TestSummary> {
        match self.rng.lock() {
            Ok(mut rng) => tests.choose(&mut *rng).cloned(),
            Err(_) => tests.choose(&mut rand::rng()).cloned(),
        }
    }
}
