use std::sync::Arc;

use quiz_core::model::TestSummary;
use storage::repository::Storage;

use crate::catalog_sync::CatalogSyncManager;
use crate::config::QuizConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::consent_service::ConsentService;
use crate::error::AppServicesError;
use crate::navigator::Navigator;
use crate::remote::{HttpQuizApi, QuizApi};
use crate::result_submitter::ResultSubmitter;
use crate::results_feed::ResultsFeed;
use crate::session_engine::{QuizSessionEngine, SessionDeps};

/// Assembles the quiz services around one store, one API client and one
/// connectivity source.
#[derive(Clone)]
pub struct AppServices {
    config: QuizConfig,
    api: Arc<dyn QuizApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    catalog: Arc<CatalogSyncManager>,
    submitter: Arc<ResultSubmitter>,
    results: Arc<ResultsFeed>,
    consent: Arc<ConsentService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or HTTP client setup fails.
    pub async fn new_sqlite(
        config: QuizConfig,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let api: Arc<dyn QuizApi> = Arc::new(HttpQuizApi::new(
            config.api_base_url.clone(),
            config.http_timeout,
        )?);
        tracing::info!(
            db = %config.database_url,
            api = %config.api_base_url,
            "quiz services ready"
        );
        Ok(Self::from_parts(config, &storage, api, connectivity))
    }

    /// Wire services from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        config: QuizConfig,
        storage: &Storage,
        api: Arc<dyn QuizApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        let catalog = Arc::new(CatalogSyncManager::new(
            Arc::clone(&api),
            Arc::clone(&storage.catalog),
            Arc::clone(&connectivity),
        ));
        let submitter = Arc::new(ResultSubmitter::new(
            Arc::clone(&api),
            Arc::clone(&connectivity),
            config.nick.clone(),
        ));
        let results = Arc::new(ResultsFeed::new(Arc::clone(&api), Arc::clone(&connectivity)));
        let consent = Arc::new(ConsentService::new(Arc::clone(&storage.flags)));

        Self {
            config,
            api,
            connectivity,
            catalog,
            submitter,
            results,
            consent,
        }
    }

    /// Collaborators for a session that reports navigation to `navigator`.
    #[must_use]
    pub fn session_deps(&self, navigator: Arc<dyn Navigator>) -> SessionDeps {
        SessionDeps {
            api: Arc::clone(&self.api),
            connectivity: Arc::clone(&self.connectivity),
            submitter: Arc::clone(&self.submitter),
            navigator,
            timings: self.config.timings,
        }
    }

    /// Start an attempt at the given catalog entry.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start_session(
        &self,
        navigator: Arc<dyn Navigator>,
        summary: &TestSummary,
    ) -> QuizSessionEngine {
        QuizSessionEngine::start(
            summary.id().clone(),
            summary.name(),
            self.session_deps(navigator),
        )
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn connectivity(&self) -> Arc<dyn ConnectivityMonitor> {
        Arc::clone(&self.connectivity)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogSyncManager> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn submitter(&self) -> Arc<ResultSubmitter> {
        Arc::clone(&self.submitter)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsFeed> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn consent(&self) -> Arc<ConsentService> {
        Arc::clone(&self.consent)
    }
}
