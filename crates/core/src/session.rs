//! Per-attempt quiz state and its transition function.
//!
//! `QuizSession` is a plain value. Every input (question set arrival, timer
//! tick, answer selection, end of the feedback pause) goes through
//! [`QuizSession::apply`], which returns the next state plus the side effects
//! the driver has to perform. Nothing here touches timers or I/O.

use rand::Rng;
use thiserror::Error;

use crate::model::{Answer, Task, TestDetail, TestId, correct_position};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("answer index {index} is out of range for {len} answers")]
    AnswerOutOfRange { index: usize, len: usize },

    #[error("question set already loaded")]
    AlreadyLoaded,

    #[error("question set has no tasks")]
    NoTasks,

    #[error("too many tasks for a single session: {len}")]
    TooManyTasks { len: usize },
}

//
// ─── STATUS / EVENTS / EFFECTS ────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for the question set.
    Loading,
    /// Countdown running, input accepted.
    AwaitingAnswer,
    /// Input locked while the answer feedback is shown.
    Evaluating,
    /// Moving to the next question or to the end.
    Advancing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loaded(TestDetail),
    /// One second of the countdown elapsed.
    Tick,
    /// The user picked the answer at this index of `current_answers`.
    Select(usize),
    /// The feedback pause after an evaluation is over.
    FeedbackElapsed,
}

/// Outcome handed to the result submitter once the attempt ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedAttempt {
    pub score: u32,
    pub total: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    StartCountdown,
    StopCountdown,
    ScheduleFeedback,
    Finish(FinishedAttempt),
}

/// How an answer button should be rendered after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMark {
    Neutral,
    SelectedCorrect,
    SelectedWrong,
    /// Correct answer revealed after a timeout.
    Revealed,
}

/// Next state together with the work the driver must carry out.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub session: QuizSession,
    pub effects: Vec<SessionEffect>,
}

impl Transition {
    fn unchanged(session: &QuizSession) -> Self {
        Self {
            session: session.clone(),
            effects: Vec::new(),
        }
    }

    /// True when the event left the state untouched.
    #[must_use]
    pub fn is_noop(&self, previous: &QuizSession) -> bool {
        self.effects.is_empty() && &self.session == previous
    }
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    test_id: TestId,
    test_name: String,
    status: SessionStatus,
    tasks: Vec<Task>,
    current_index: usize,
    current_answers: Vec<Answer>,
    selected_answer: Option<usize>,
    correct_answer: Option<usize>,
    remaining_secs: u32,
    count_correct: u32,
    total: u32,
    input_locked: bool,
    finished: bool,
}

impl QuizSession {
    /// Fresh session waiting for its question set.
    #[must_use]
    pub fn loading(test_id: TestId, test_name: impl Into<String>) -> Self {
        Self {
            test_id,
            test_name: test_name.into(),
            status: SessionStatus::Loading,
            tasks: Vec::new(),
            current_index: 0,
            current_answers: Vec::new(),
            selected_answer: None,
            correct_answer: None,
            remaining_secs: 0,
            count_correct: 0,
            total: 0,
            input_locked: true,
            finished: false,
        }
    }

    /// Derive the next state from this one.
    ///
    /// Events that do not apply to the current status (a tick outside the
    /// countdown, a selection while input is locked, a late feedback timer)
    /// return the state unchanged with no effects.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` when a selection is out of range or a
    /// question set arrives twice.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        event: SessionEvent,
        rng: &mut R,
    ) -> Result<Transition, SessionStateError> {
        match event {
            SessionEvent::Loaded(detail) => self.on_loaded(detail, rng),
            SessionEvent::Tick => Ok(self.on_tick()),
            SessionEvent::Select(index) => self.on_select(index),
            SessionEvent::FeedbackElapsed => Ok(self.on_feedback_elapsed(rng)),
        }
    }

    fn on_loaded<R: Rng + ?Sized>(
        &self,
        detail: TestDetail,
        rng: &mut R,
    ) -> Result<Transition, SessionStateError> {
        if self.status != SessionStatus::Loading {
            return Err(SessionStateError::AlreadyLoaded);
        }

        let tasks = detail.into_shuffled_tasks(rng);
        let total = u32::try_from(tasks.len())
            .map_err(|_| SessionStateError::TooManyTasks { len: tasks.len() })?;
        let first = tasks.first().ok_or(SessionStateError::NoTasks)?;

        let mut next = self.clone();
        next.remaining_secs = first.duration_secs();
        next.current_answers = first.answers().to_vec();
        next.tasks = tasks;
        next.total = total;
        next.current_index = 0;
        next.selected_answer = None;
        next.correct_answer = None;
        next.input_locked = false;
        next.status = SessionStatus::AwaitingAnswer;

        Ok(Transition {
            session: next,
            effects: vec![SessionEffect::StartCountdown],
        })
    }

    fn on_tick(&self) -> Transition {
        if self.status != SessionStatus::AwaitingAnswer {
            return Transition::unchanged(self);
        }

        let mut next = self.clone();
        next.remaining_secs = self.remaining_secs.saturating_sub(1);
        if next.remaining_secs > 0 {
            return Transition {
                session: next,
                effects: Vec::new(),
            };
        }

        // Timed out: no selection, reveal the correct answer, no score.
        next.input_locked = true;
        next.status = SessionStatus::Evaluating;
        next.correct_answer = correct_position(&next.current_answers);
        Transition {
            session: next,
            effects: vec![SessionEffect::StopCountdown, SessionEffect::ScheduleFeedback],
        }
    }

    fn on_select(&self, index: usize) -> Result<Transition, SessionStateError> {
        if self.status != SessionStatus::AwaitingAnswer || self.input_locked {
            return Ok(Transition::unchanged(self));
        }

        let answer = self
            .current_answers
            .get(index)
            .ok_or(SessionStateError::AnswerOutOfRange {
                index,
                len: self.current_answers.len(),
            })?;

        let mut next = self.clone();
        next.input_locked = true;
        next.status = SessionStatus::Evaluating;
        next.selected_answer = Some(index);
        if answer.is_correct {
            next.count_correct = self.count_correct.saturating_add(1).min(self.total);
        }

        Ok(Transition {
            session: next,
            effects: vec![SessionEffect::StopCountdown, SessionEffect::ScheduleFeedback],
        })
    }

    fn on_feedback_elapsed<R: Rng + ?Sized>(&self, rng: &mut R) -> Transition {
        if self.status != SessionStatus::Evaluating {
            return Transition::unchanged(self);
        }

        let mut next = self.clone();
        next.status = SessionStatus::Advancing;
        next.advance(rng)
    }

    fn advance<R: Rng + ?Sized>(mut self, rng: &mut R) -> Transition {
        let next_index = self.current_index + 1;
        let Some(task) = self.tasks.get(next_index) else {
            return self.finish();
        };

        self.remaining_secs = task.duration_secs();
        self.current_answers = task.shuffled_answers(rng);
        self.current_index = next_index;
        self.selected_answer = None;
        self.correct_answer = None;
        self.input_locked = false;
        self.status = SessionStatus::AwaitingAnswer;

        Transition {
            session: self,
            effects: vec![SessionEffect::StartCountdown],
        }
    }

    fn finish(mut self) -> Transition {
        if self.finished {
            return Transition {
                session: self,
                effects: Vec::new(),
            };
        }

        self.finished = true;
        self.input_locked = true;
        self.status = SessionStatus::Finished;
        let attempt = FinishedAttempt {
            score: self.count_correct,
            total: self.total,
            label: self.test_name.clone(),
        };
        Transition {
            session: self,
            effects: vec![SessionEffect::Finish(attempt)],
        }
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 1-based number of the question on screen, 0 while loading.
    #[must_use]
    pub fn question_number(&self) -> usize {
        if self.tasks.is_empty() {
            0
        } else {
            self.current_index + 1
        }
    }

    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_index)
    }

    #[must_use]
    pub fn current_answers(&self) -> &[Answer] {
        &self.current_answers
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<usize> {
        self.correct_answer
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn count_correct(&self) -> u32 {
        self.count_correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn is_input_locked(&self) -> bool {
        self.input_locked
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Remaining share of the current question's time, in `0.0..=1.0`.
    #[must_use]
    pub fn time_fraction(&self) -> f32 {
        match self.current_task() {
            Some(task) if task.duration_secs() > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let fraction = self.remaining_secs as f32 / task.duration_secs() as f32;
                fraction.clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Rendering hint for the answer at `index` of `current_answers`.
    #[must_use]
    pub fn answer_mark(&self, index: usize) -> AnswerMark {
        match (self.selected_answer, self.correct_answer) {
            (Some(selected), _) if selected == index => {
                let correct = self
                    .current_answers
                    .get(index)
                    .is_some_and(|answer| answer.is_correct);
                if correct {
                    AnswerMark::SelectedCorrect
                } else {
                    AnswerMark::SelectedWrong
                }
            }
            (None, Some(correct)) if correct == index => AnswerMark::Revealed,
            _ => AnswerMark::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawTask, RawTestDetail};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn detail(durations: &[u32]) -> TestDetail {
        let tasks = durations
            .iter()
            .enumerate()
            .map(|(i, duration)| RawTask {
                question: format!("q{i}"),
                duration: *duration,
                answers: vec![
                    Answer::new(format!("q{i}-right"), true),
                    Answer::new(format!("q{i}-wrong-1"), false),
                    Answer::new(format!("q{i}-wrong-2"), false),
                ],
            })
            .collect();
        TestDetail::from_raw(TestId::new("t1"), RawTestDetail { tasks }).unwrap()
    }

    fn loaded(durations: &[u32], rng: &mut StdRng) -> QuizSession {
        let session = QuizSession::loading(TestId::new("t1"), "Quiz");
        let t = session
            .apply(SessionEvent::Loaded(detail(durations)), rng)
            .unwrap();
        assert_eq!(t.effects, vec![SessionEffect::StartCountdown]);
        t.session
    }

    fn index_of(session: &QuizSession, correct: bool) -> usize {
        session
            .current_answers()
            .iter()
            .position(|a| a.is_correct == correct)
            .unwrap()
    }

    fn step(session: &QuizSession, event: SessionEvent, rng: &mut StdRng) -> Transition {
        session.apply(event, rng).unwrap()
    }

    #[test]
    fn load_enters_awaiting_answer_with_first_duration() {
        let mut rng = StdRng::seed_from_u64(1);
        let session = loaded(&[7, 7, 7], &mut rng);
        assert_eq!(session.status(), SessionStatus::AwaitingAnswer);
        assert_eq!(session.total(), 3);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.question_number(), 1);
        assert_eq!(session.remaining_secs(), 7);
        assert!(!session.is_input_locked());
        assert_eq!(session.current_answers().len(), 3);
        assert!((session.time_fraction() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn second_load_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let session = loaded(&[5], &mut rng);
        let err = session
            .apply(SessionEvent::Loaded(detail(&[5])), &mut rng)
            .unwrap_err();
        assert_eq!(err, SessionStateError::AlreadyLoaded);
    }

    #[test]
    fn correct_selection_scores_and_locks_input() {
        let mut rng = StdRng::seed_from_u64(2);
        let session = loaded(&[10, 10], &mut rng);
        let right = index_of(&session, true);

        let t = step(&session, SessionEvent::Select(right), &mut rng);
        assert_eq!(
            t.effects,
            vec![SessionEffect::StopCountdown, SessionEffect::ScheduleFeedback]
        );
        assert_eq!(t.session.status(), SessionStatus::Evaluating);
        assert_eq!(t.session.count_correct(), 1);
        assert_eq!(t.session.selected_answer(), Some(right));
        assert!(t.session.is_input_locked());
        assert_eq!(t.session.answer_mark(right), AnswerMark::SelectedCorrect);
    }

    #[test]
    fn repeated_selection_while_locked_is_noop() {
        let mut rng = StdRng::seed_from_u64(3);
        let session = loaded(&[10], &mut rng);
        let right = index_of(&session, true);
        let evaluating = step(&session, SessionEvent::Select(right), &mut rng).session;

        let again = step(&evaluating, SessionEvent::Select(right), &mut rng);
        assert!(again.is_noop(&evaluating));
        assert_eq!(again.session.count_correct(), 1);
    }

    #[test]
    fn out_of_range_selection_is_a_state_error() {
        let mut rng = StdRng::seed_from_u64(4);
        let session = loaded(&[10], &mut rng);
        let err = session.apply(SessionEvent::Select(9), &mut rng).unwrap_err();
        assert_eq!(err, SessionStateError::AnswerOutOfRange { index: 9, len: 3 });
    }

    #[test]
    fn timeout_reveals_correct_answer_without_scoring() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = loaded(&[3], &mut rng);

        session = step(&session, SessionEvent::Tick, &mut rng).session;
        session = step(&session, SessionEvent::Tick, &mut rng).session;
        assert_eq!(session.remaining_secs(), 1);
        assert_eq!(session.status(), SessionStatus::AwaitingAnswer);

        let t = step(&session, SessionEvent::Tick, &mut rng);
        assert_eq!(
            t.effects,
            vec![SessionEffect::StopCountdown, SessionEffect::ScheduleFeedback]
        );
        let session = t.session;
        assert_eq!(session.remaining_secs(), 0);
        assert_eq!(session.status(), SessionStatus::Evaluating);
        assert_eq!(session.selected_answer(), None);
        let right = index_of(&session, true);
        assert_eq!(session.correct_answer(), Some(right));
        assert_eq!(session.answer_mark(right), AnswerMark::Revealed);
        assert_eq!(session.count_correct(), 0);
    }

    #[test]
    fn ticks_outside_countdown_never_go_negative() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut session = loaded(&[1], &mut rng);
        session = step(&session, SessionEvent::Tick, &mut rng).session;
        assert_eq!(session.status(), SessionStatus::Evaluating);

        for _ in 0..5 {
            let t = step(&session, SessionEvent::Tick, &mut rng);
            assert!(t.is_noop(&session));
        }
        assert_eq!(session.remaining_secs(), 0);
    }

    #[test]
    fn feedback_advances_to_next_question() {
        let mut rng = StdRng::seed_from_u64(7);
        let session = loaded(&[10, 4], &mut rng);
        let wrong = index_of(&session, false);
        let evaluating = step(&session, SessionEvent::Select(wrong), &mut rng).session;
        assert_eq!(evaluating.answer_mark(wrong), AnswerMark::SelectedWrong);

        let t = step(&evaluating, SessionEvent::FeedbackElapsed, &mut rng);
        assert_eq!(t.effects, vec![SessionEffect::StartCountdown]);
        let next = t.session;
        assert_eq!(next.status(), SessionStatus::AwaitingAnswer);
        assert_eq!(next.current_index(), 1);
        assert_eq!(next.remaining_secs(), next.current_task().unwrap().duration_secs());
        assert_eq!(next.selected_answer(), None);
        assert_eq!(next.correct_answer(), None);
        assert!(!next.is_input_locked());
        assert_eq!(next.count_correct(), 0);
    }

    #[test]
    fn last_question_finishes_exactly_once() {
        let mut rng = StdRng::seed_from_u64(8);
        let session = loaded(&[10, 10], &mut rng);

        let right = index_of(&session, true);
        let s = step(&session, SessionEvent::Select(right), &mut rng).session;
        let s = step(&s, SessionEvent::FeedbackElapsed, &mut rng).session;
        let wrong = index_of(&s, false);
        let s = step(&s, SessionEvent::Select(wrong), &mut rng).session;

        let t = step(&s, SessionEvent::FeedbackElapsed, &mut rng);
        assert_eq!(
            t.effects,
            vec![SessionEffect::Finish(FinishedAttempt {
                score: 1,
                total: 2,
                label: "Quiz".to_owned(),
            })]
        );
        let finished = t.session;
        assert!(finished.is_finished());
        assert_eq!(finished.status(), SessionStatus::Finished);
        assert!(finished.current_index() as u32 <= finished.total());

        let late = step(&finished, SessionEvent::FeedbackElapsed, &mut rng);
        assert!(late.is_noop(&finished));
        let late_select = step(&finished, SessionEvent::Select(0), &mut rng);
        assert!(late_select.is_noop(&finished));
    }

    #[test]
    fn events_while_loading_are_ignored() {
        let mut rng = StdRng::seed_from_u64(9);
        let session = QuizSession::loading(TestId::new("t1"), "Quiz");
        assert!(step(&session, SessionEvent::Tick, &mut rng).is_noop(&session));
        assert!(step(&session, SessionEvent::Select(0), &mut rng).is_noop(&session));
        assert!(step(&session, SessionEvent::FeedbackElapsed, &mut rng).is_noop(&session));
        assert_eq!(session.question_number(), 0);
        assert!(session.time_fraction().abs() < f32::EPSILON);
    }
}
