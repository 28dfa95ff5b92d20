use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    RawTestDetail, ResultPayload, ResultRecord, TestDetail, TestId, TestSummary,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::NetworkError;

/// Remote quiz service endpoints consumed by the client.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// `GET /quiz/tests`
    async fn fetch_catalog(&self) -> Result<Vec<TestSummary>, NetworkError>;

    /// `GET /quiz/test/{id}`
    async fn fetch_test(&self, id: &TestId) -> Result<TestDetail, NetworkError>;

    /// `GET /quiz/results?last=N`
    async fn fetch_results(&self, last: u32) -> Result<Vec<ResultRecord>, NetworkError>;

    /// `POST /quiz/result`; the response body is ignored.
    async fn post_result(&self, payload: &ResultPayload) -> Result<(), NetworkError>;
}

/// `reqwest` implementation of [`QuizApi`].
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    base_url: Url,
}

impl HttpQuizApi {
    /// Build a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the TLS backend cannot be initialised.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, NetworkError> {
        endpoint(&self.base_url, segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, NetworkError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        decode(&body)
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn fetch_catalog(&self) -> Result<Vec<TestSummary>, NetworkError> {
        let url = self.endpoint(&["quiz", "tests"])?;
        let raw: Vec<TestSummary> = self.get_json(url).await?;
        validate_catalog(raw)
    }

    async fn fetch_test(&self, id: &TestId) -> Result<TestDetail, NetworkError> {
        let url = self.endpoint(&["quiz", "test", id.as_str()])?;
        let raw: RawTestDetail = self.get_json(url).await?;
        TestDetail::from_raw(id.clone(), raw).map_err(|e| NetworkError::Malformed(e.to_string()))
    }

    async fn fetch_results(&self, last: u32) -> Result<Vec<ResultRecord>, NetworkError> {
        let mut url = self.endpoint(&["quiz", "results"])?;
        url.query_pairs_mut().append_pair("last", &last.to_string());
        self.get_json(url).await
    }

    async fn post_result(&self, payload: &ResultPayload) -> Result<(), NetworkError> {
        let url = self.endpoint(&["quiz", "result"])?;
        tracing::debug!(%url, score = payload.score, total = payload.total, "POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, NetworkError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| NetworkError::Transport(format!("base url cannot hold a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, NetworkError> {
    serde_json::from_slice(body).map_err(|e| NetworkError::Malformed(e.to_string()))
}

/// Reject the whole catalog if any entry is unusable, rather than showing holes.
fn validate_catalog(raw: Vec<TestSummary>) -> Result<Vec<TestSummary>, NetworkError> {
    raw.into_iter()
        .map(|summary| {
            summary
                .validate()
                .map_err(|e| NetworkError::Malformed(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://quiz.example/api/").unwrap()
    }

    #[test]
    fn endpoints_stay_under_base_path() {
        let url = endpoint(&base(), &["quiz", "tests"]).unwrap();
        assert_eq!(url.as_str(), "https://quiz.example/api/quiz/tests");

        let url = endpoint(&base(), &["quiz", "test", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://quiz.example/api/quiz/test/a%2Fb%20c");
    }

    #[test]
    fn catalog_payload_is_validated() {
        let ok: Vec<TestSummary> = decode(
            br#"[{"id":"1","name":"A","description":"d","level":"easy","numberOfTasks":2}]"#,
        )
        .unwrap();
        assert_eq!(validate_catalog(ok).unwrap().len(), 1);

        let blank: Vec<TestSummary> =
            decode(br#"[{"id":" ","name":"A","numberOfTasks":2}]"#).unwrap();
        assert!(matches!(
            validate_catalog(blank),
            Err(NetworkError::Malformed(_))
        ));
    }

    #[test]
    fn catalog_fields_are_trimmed_at_the_boundary() {
        let raw: Vec<TestSummary> = decode(
            br#"[{"id":"m","name":"Math ","description":" algebra","level":"easy ","numberOfTasks":3}]"#,
        )
        .unwrap();
        let tests = validate_catalog(raw).unwrap();
        assert_eq!(tests[0].name(), "Math");
        assert_eq!(tests[0].description(), "algebra");
        assert_eq!(tests[0].level(), "easy");
    }

    #[test]
    fn undecodable_body_is_malformed() {
        let err = decode::<Vec<TestSummary>>(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, NetworkError::Malformed(_)));

        let err = decode::<RawTestDetail>(br#"{"tasks":[{"question":"q"}]}"#).unwrap_err();
        assert!(matches!(err, NetworkError::Malformed(_)));
    }
}
