use std::sync::Arc;

use quiz_core::model::{ResultRecord, sort_most_recent_first};

use crate::connectivity::ConnectivityMonitor;
use crate::error::NetworkError;
use crate::remote::QuizApi;

/// Read side of the shared results board.
#[derive(Clone)]
pub struct ResultsFeed {
    api: Arc<dyn QuizApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
}

impl ResultsFeed {
    #[must_use]
    pub fn new(api: Arc<dyn QuizApi>, connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        Self { api, connectivity }
    }

    /// The `last` most recent results, newest first.
    ///
    /// Records with the same timestamp keep the order the server sent them in.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::Offline` without a request when offline, or the
    /// failure of the request itself.
    pub async fn recent(&self, last: u32) -> Result<Vec<ResultRecord>, NetworkError> {
        if !self.connectivity.current() {
            return Err(NetworkError::Offline);
        }
        let mut records = self.api.fetch_results(last).await?;
        sort_most_recent_first(&mut records);
        tracing::debug!(count = records.len(), last, "results fetched");
        Ok(records)
    }
}
