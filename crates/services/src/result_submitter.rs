use std::sync::Arc;

use quiz_core::model::ResultPayload;

use crate::connectivity::ConnectivityMonitor;
use crate::remote::QuizApi;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    SkippedOffline,
    Failed,
}

/// Best-effort delivery of a finished attempt's score.
///
/// One attempt, no retry, no queue. The outcome is informational only.
#[derive(Clone)]
pub struct ResultSubmitter {
    api: Arc<dyn QuizApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    nick: String,
}

impl ResultSubmitter {
    #[must_use]
    pub fn new(
        api: Arc<dyn QuizApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        nick: impl Into<String>,
    ) -> Self {
        Self {
            api,
            connectivity,
            nick: nick.into(),
        }
    }

    #[must_use]
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub async fn submit(&self, score: u32, total: u32, label: &str) -> SubmitOutcome {
        if !self.connectivity.current() {
            tracing::info!(score, total, label, "offline, result not sent");
            return SubmitOutcome::SkippedOffline;
        }

        let payload = ResultPayload::new(self.nick.clone(), score, total, label);
        match self.api.post_result(&payload).await {
            Ok(()) => {
                tracing::info!(score, total, label, "result sent");
                SubmitOutcome::Sent
            }
            Err(err) => {
                tracing::warn!(error = %err, score, total, label, "failed to send result");
                SubmitOutcome::Failed
            }
        }
    }
}
