use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score of a finished attempt as stored by the remote service.
///
/// Write-only from the client's side: `created_on` is assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub nick: String,
    pub score: u32,
    pub total: u32,
    #[serde(rename = "type")]
    pub label: String,
    pub created_on: DateTime<Utc>,
}

/// Body of `POST /quiz/result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub nick: String,
    pub score: u32,
    pub total: u32,
    #[serde(rename = "type")]
    pub label: String,
}

impl ResultPayload {
    #[must_use]
    pub fn new(nick: impl Into<String>, score: u32, total: u32, label: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            score,
            total,
            label: label.into(),
        }
    }
}

/// Orders records newest first.
///
/// The sort is stable, so records sharing a timestamp keep the order in which
/// the server returned them.
pub fn sort_most_recent_first(records: &mut [ResultRecord]) {
    records.sort_by(|a, b| b.created_on.cmp(&a.created_on));
}
