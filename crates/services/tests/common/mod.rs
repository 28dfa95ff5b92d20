#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    Answer, RawTask, RawTestDetail, ResultPayload, ResultRecord, TestDetail, TestId, TestSummary,
};
use services::{
    ChannelNavigator, ManualConnectivity, NetworkError, QuizApi, ResultSubmitter, Route,
    SessionDeps, SessionTimings,
};
use tokio::sync::mpsc;

/// Scriptable stand-in for the remote quiz service.
#[derive(Default)]
pub struct FakeApi {
    catalog: Mutex<Option<Result<Vec<TestSummary>, NetworkError>>>,
    details: Mutex<HashMap<TestId, TestDetail>>,
    detail_failure: Mutex<Option<NetworkError>>,
    detail_delay: Mutex<Option<Duration>>,
    results: Mutex<Vec<ResultRecord>>,
    post_failure: Mutex<Option<NetworkError>>,
    posted: Mutex<Vec<ResultPayload>>,
    detail_calls: AtomicUsize,
    results_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_catalog(&self, catalog: Result<Vec<TestSummary>, NetworkError>) {
        *self.catalog.lock().unwrap() = Some(catalog);
    }

    pub fn add_detail(&self, detail: TestDetail) {
        self.details
            .lock()
            .unwrap()
            .insert(detail.id().clone(), detail);
    }

    pub fn fail_details(&self, err: NetworkError) {
        *self.detail_failure.lock().unwrap() = Some(err);
    }

    pub fn delay_details(&self, delay: Duration) {
        *self.detail_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_results(&self, results: Vec<ResultRecord>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn fail_posts(&self, err: NetworkError) {
        *self.post_failure.lock().unwrap() = Some(err);
    }

    pub fn posted(&self) -> Vec<ResultPayload> {
        self.posted.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizApi for FakeApi {
    async fn fetch_catalog(&self) -> Result<Vec<TestSummary>, NetworkError> {
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(NetworkError::Status(503)))
    }

    async fn fetch_test(&self, id: &TestId) -> Result<TestDetail, NetworkError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.detail_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.detail_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(NetworkError::Status(404))
    }

    async fn fetch_results(&self, last: u32) -> Result<Vec<ResultRecord>, NetworkError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        let results = self.results.lock().unwrap();
        Ok(results.iter().take(last as usize).cloned().collect())
    }

    async fn post_result(&self, payload: &ResultPayload) -> Result<(), NetworkError> {
        if let Some(err) = self.post_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.posted.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

pub fn summary(id: &str, name: &str) -> TestSummary {
    TestSummary::new(TestId::new(id), name, "desc", "easy", 2).unwrap()
}

/// Question set where every task has three answers and the first is correct.
pub fn detail(id: &str, durations: &[u32]) -> TestDetail {
    let tasks = durations
        .iter()
        .enumerate()
        .map(|(i, duration)| RawTask {
            question: format!("Question {i}"),
            duration: *duration,
            answers: vec![
                Answer::new(format!("q{i} right"), true),
                Answer::new(format!("q{i} wrong a"), false),
                Answer::new(format!("q{i} wrong b"), false),
            ],
        })
        .collect();
    TestDetail::from_raw(TestId::new(id), RawTestDetail { tasks }).unwrap()
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub connectivity: ManualConnectivity,
    pub routes: mpsc::UnboundedReceiver<Route>,
    pub deps: SessionDeps,
}

pub fn harness(online: bool) -> Harness {
    let api = FakeApi::new();
    let connectivity = ManualConnectivity::new(online);
    let (navigator, routes) = ChannelNavigator::channel();
    let submitter = ResultSubmitter::new(
        api.clone() as Arc<dyn QuizApi>,
        Arc::new(connectivity.clone()),
        "tester",
    );
    let deps = SessionDeps {
        api: api.clone(),
        connectivity: Arc::new(connectivity.clone()),
        submitter: Arc::new(submitter),
        navigator: Arc::new(navigator),
        timings: SessionTimings::default(),
    };
    Harness {
        api,
        connectivity,
        routes,
        deps,
    }
}
