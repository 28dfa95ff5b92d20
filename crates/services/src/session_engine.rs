//! Runtime driver for a single quiz attempt.
//!
//! The engine owns one tokio task that feeds [`SessionEvent`]s into the pure
//! [`QuizSession`] transition function and performs the resulting effects:
//! the one-second countdown, the feedback pause, result submission and
//! navigation. All state changes happen on that task, one at a time.

use std::future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use quiz_core::model::{TestDetail, TestId};
use quiz_core::session::{
    FinishedAttempt, QuizSession, SessionEffect, SessionEvent, SessionStateError, SessionStatus,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

use crate::config::SessionTimings;
use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::error::{NetworkError, QuizError};
use crate::navigator::{Navigator, Route};
use crate::remote::QuizApi;
use crate::result_submitter::{ResultSubmitter, SubmitOutcome};

/// Collaborators a session needs, shared between engines.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn QuizApi>,
    pub connectivity: Arc<dyn ConnectivityMonitor>,
    pub submitter: Arc<ResultSubmitter>,
    pub navigator: Arc<dyn Navigator>,
    pub timings: SessionTimings,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub session: QuizSession,
    /// Set when the question set could not be fetched; the session stays `Loading`.
    pub load_error: Option<NetworkError>,
}

#[derive(Debug)]
enum Command {
    Select(usize),
}

type PendingSubmission = Arc<Mutex<Option<JoinHandle<SubmitOutcome>>>>;

/// Handle to a running quiz attempt.
///
/// Dropping the handle tears the attempt down.
pub struct QuizSessionEngine {
    test_id: TestId,
    test_name: String,
    seed: Option<u64>,
    deps: SessionDeps,
    snapshots: Arc<watch::Sender<EngineSnapshot>>,
    online: Arc<watch::Sender<bool>>,
    commands: mpsc::UnboundedSender<Command>,
    active: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
    subscription: Option<Subscription>,
    submission: PendingSubmission,
}

impl QuizSessionEngine {
    /// Start an attempt at `test_id` and begin loading its question set.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(test_id: TestId, test_name: impl Into<String>, deps: SessionDeps) -> Self {
        Self::launch(test_id, test_name.into(), None, deps)
    }

    /// Like [`start`](Self::start) with deterministic shuffles.
    #[must_use]
    pub fn start_seeded(
        test_id: TestId,
        test_name: impl Into<String>,
        seed: u64,
        deps: SessionDeps,
    ) -> Self {
        Self::launch(test_id, test_name.into(), Some(seed), deps)
    }

    fn launch(test_id: TestId, test_name: String, seed: Option<u64>, deps: SessionDeps) -> Self {
        let initial = EngineSnapshot {
            session: QuizSession::loading(test_id.clone(), test_name.clone()),
            load_error: None,
        };
        let (snapshots, _) = watch::channel(initial);
        let (online, _) = watch::channel(deps.connectivity.current());
        let (commands, _) = mpsc::unbounded_channel();

        let mut engine = Self {
            test_id,
            test_name,
            seed,
            deps,
            snapshots: Arc::new(snapshots),
            online: Arc::new(online),
            commands,
            active: Arc::new(AtomicBool::new(false)),
            driver: None,
            subscription: None,
            submission: Arc::new(Mutex::new(None)),
        };
        engine.spawn_driver();
        engine
    }

    fn spawn_driver(&mut self) {
        let active = Arc::new(AtomicBool::new(true));
        let (commands, command_rx) = mpsc::unbounded_channel();

        let session = QuizSession::loading(self.test_id.clone(), self.test_name.clone());
        self.snapshots.send_replace(EngineSnapshot {
            session: session.clone(),
            load_error: None,
        });

        let online = Arc::clone(&self.online);
        let listener_active = Arc::clone(&active);
        self.subscription = Some(self.deps.connectivity.subscribe(Arc::new(move |is_online| {
            if listener_active.load(Ordering::SeqCst) {
                online.send_replace(is_online);
            }
        })));
        self.online.send_replace(self.deps.connectivity.current());

        let driver = Driver {
            session,
            deps: self.deps.clone(),
            rng: self
                .seed
                .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
            active: Arc::clone(&active),
            snapshots: Arc::clone(&self.snapshots),
            commands: command_rx,
            countdown: None,
            feedback: None,
            submission: Arc::clone(&self.submission),
        };

        tracing::debug!(test_id = %self.test_id, "session started");
        self.commands = commands;
        self.active = active;
        self.driver = Some(tokio::spawn(driver.run()));
    }

    /// Ask the engine to evaluate the answer at `index` of the current answers.
    ///
    /// Returns `Ok(false)` when the selection is ignored, i.e. the session is
    /// not accepting input right now.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::State` when `index` is out of range.
    pub fn select_answer(&self, index: usize) -> Result<bool, QuizError> {
        if !self.is_active() {
            return Ok(false);
        }

        {
            let snapshot = self.snapshots.borrow();
            let session = &snapshot.session;
            if session.status() != SessionStatus::AwaitingAnswer || session.is_input_locked() {
                return Ok(false);
            }
            let len = session.current_answers().len();
            if index >= len {
                return Err(SessionStateError::AnswerOutOfRange { index, len }.into());
            }
        }

        Ok(self.commands.send(Command::Select(index)).is_ok())
    }

    /// Reset the attempt for the same test: teardown, then a fresh load.
    pub fn restart(&mut self) {
        tracing::info!(test_id = %self.test_id, "restarting session");
        self.teardown();
        self.spawn_driver();
    }

    /// Stop the attempt. Idempotent.
    ///
    /// Cancels the timers and releases the connectivity listener. Work still in
    /// flight is ignored when it completes.
    pub fn teardown(&mut self) {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if was_active {
            tracing::debug!(test_id = %self.test_id, "session torn down");
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot, across restarts.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshots.subscribe()
    }

    /// Wait for the result submission of a finished attempt.
    ///
    /// Submission runs detached from the engine, so it survives teardown; a
    /// host that is about to exit can use this to let it complete. Returns
    /// `None` if no attempt has finished yet or the outcome was already taken.
    pub async fn wait_for_submission(&self) -> Option<SubmitOutcome> {
        let handle = self.submission.lock().ok()?.take()?;
        handle.await.ok()
    }

    /// Connectivity as seen by this attempt, e.g. for a "results will not be saved" notice.
    #[must_use]
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Drop for QuizSessionEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

//
// ─── DRIVER ───────────────────────────────────────────────────────────────────
//

struct Driver {
    session: QuizSession,
    deps: SessionDeps,
    rng: StdRng,
    active: Arc<AtomicBool>,
    snapshots: Arc<watch::Sender<EngineSnapshot>>,
    commands: mpsc::UnboundedReceiver<Command>,
    countdown: Option<Interval>,
    feedback: Option<Pin<Box<Sleep>>>,
    submission: PendingSubmission,
}

impl Driver {
    async fn run(mut self) {
        let Some(detail) = self.load().await else {
            return;
        };
        if self.dispatch(SessionEvent::Loaded(detail)).is_break() {
            return;
        }

        while self.is_active() {
            let event = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Select(index)) => SessionEvent::Select(index),
                    None => break,
                },
                () = next_tick(&mut self.countdown) => SessionEvent::Tick,
                () = feedback_elapsed(&mut self.feedback) => SessionEvent::FeedbackElapsed,
            };
            if event == SessionEvent::FeedbackElapsed {
                self.feedback = None;
            }

            if self.dispatch(event).is_break() {
                break;
            }
        }
    }

    async fn load(&mut self) -> Option<TestDetail> {
        let test_id = self.session.test_id().clone();
        if !self.deps.connectivity.current() {
            self.fail_load(&test_id, NetworkError::Offline);
            return None;
        }

        let fetched = self.deps.api.fetch_test(&test_id).await;
        if !self.is_active() {
            return None;
        }
        match fetched {
            Ok(detail) => Some(detail),
            Err(err) => {
                self.fail_load(&test_id, err);
                None
            }
        }
    }

    fn fail_load(&self, test_id: &TestId, err: NetworkError) {
        tracing::warn!(%test_id, error = %err, "failed to load question set");
        self.publish(Some(err));
    }

    fn dispatch(&mut self, event: SessionEvent) -> ControlFlow<()> {
        if !self.is_active() {
            return ControlFlow::Break(());
        }

        let transition = match self.session.apply(event, &mut self.rng) {
            Ok(transition) => transition,
            Err(err) => {
                tracing::warn!(error = %err, "session event rejected");
                return ControlFlow::Continue(());
            }
        };
        if transition.is_noop(&self.session) {
            return ControlFlow::Continue(());
        }

        self.session = transition.session;
        tracing::debug!(
            status = ?self.session.status(),
            question = self.session.question_number(),
            remaining = self.session.remaining_secs(),
            "session transition"
        );

        let mut finished = false;
        for effect in transition.effects {
            match effect {
                SessionEffect::StartCountdown => self.countdown = Some(self.new_countdown()),
                SessionEffect::StopCountdown => self.countdown = None,
                SessionEffect::ScheduleFeedback => {
                    self.feedback = Some(Box::pin(time::sleep(self.deps.timings.feedback_delay)));
                }
                SessionEffect::Finish(attempt) => {
                    if !self.finish(attempt) {
                        return ControlFlow::Break(());
                    }
                    finished = true;
                    break;
                }
            }
        }

        // The submission handle is in place before anyone can observe `Finished`.
        self.publish(None);
        if finished {
            self.deps.navigator.go_to(Route::Results);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    /// Stop the timers and spawn the result submission. Returns `false` when
    /// the engine was torn down meanwhile and nothing was submitted.
    fn finish(&mut self, attempt: FinishedAttempt) -> bool {
        self.countdown = None;
        self.feedback = None;
        if !self.is_active() {
            tracing::debug!(test_id = %self.session.test_id(), "torn down before finishing, result dropped");
            return false;
        }
        tracing::info!(
            test_id = %self.session.test_id(),
            score = attempt.score,
            total = attempt.total,
            "session finished"
        );

        let submitter = Arc::clone(&self.deps.submitter);
        let handle = tokio::spawn(async move {
            submitter
                .submit(attempt.score, attempt.total, &attempt.label)
                .await
        });
        if let Ok(mut pending) = self.submission.lock() {
            *pending = Some(handle);
        }
        true
    }

    fn new_countdown(&self) -> Interval {
        let tick = self.deps.timings.tick;
        let mut interval = time::interval_at(Instant::now() + tick, tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    fn publish(&self, load_error: Option<NetworkError>) {
        if !self.is_active() {
            return;
        }
        self.snapshots.send_replace(EngineSnapshot {
            session: self.session.clone(),
            load_error,
        });
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

async fn feedback_elapsed(delay: &mut Option<Pin<Box<Sleep>>>) {
    match delay {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
