use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TestId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Reasons a question set is rejected at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDetailError {
    #[error("test has no tasks")]
    NoTasks,

    #[error("task {task} has a zero duration")]
    ZeroDuration { task: usize },

    #[error("task {task} has no answers")]
    NoAnswers { task: usize },

    #[error("task {task} has {correct} correct answers, expected exactly one")]
    CorrectAnswerCount { task: usize, correct: usize },
}

//
// ─── ANSWER / TASK ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub content: String,
    pub is_correct: bool,
}

impl Answer {
    #[must_use]
    pub fn new(content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            content: content.into(),
            is_correct,
        }
    }
}

/// One question with its time limit (seconds) and candidate answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    question: String,
    duration_secs: u32,
    answers: Vec<Answer>,
}

impl Task {
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Index of the single correct answer in the task's current order.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        correct_position(&self.answers)
    }

    /// Returns a copy of the answers in a fresh uniformly random order.
    #[must_use]
    pub fn shuffled_answers<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Answer> {
        let mut answers = self.answers.clone();
        answers.shuffle(rng);
        answers
    }

    fn shuffle_answers<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.answers.shuffle(rng);
    }
}

/// Position of the correct answer inside an arbitrary answer ordering.
#[must_use]
pub fn correct_position(answers: &[Answer]) -> Option<usize> {
    answers.iter().position(|answer| answer.is_correct)
}

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

/// Task as it arrives from the remote service, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub question: String,
    pub duration: u32,
    pub answers: Vec<Answer>,
}

/// Body of `GET /quiz/test/{id}`; fields other than `tasks` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTestDetail {
    pub tasks: Vec<RawTask>,
}

//
// ─── TEST DETAIL ──────────────────────────────────────────────────────────────
//

/// Validated question set for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDetail {
    id: TestId,
    tasks: Vec<Task>,
}

impl TestDetail {
    /// Validate a decoded payload into a question set.
    ///
    /// # Errors
    ///
    /// Returns `TestDetailError` when the payload has no tasks, a task lasts zero
    /// seconds, a task has no answers, or a task does not have exactly one
    /// correct answer.
    pub fn from_raw(id: TestId, raw: RawTestDetail) -> Result<Self, TestDetailError> {
        if raw.tasks.is_empty() {
            return Err(TestDetailError::NoTasks);
        }

        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for (index, task) in raw.tasks.into_iter().enumerate() {
            if task.duration == 0 {
                return Err(TestDetailError::ZeroDuration { task: index });
            }
            if task.answers.is_empty() {
                return Err(TestDetailError::NoAnswers { task: index });
            }
            let correct = task.answers.iter().filter(|a| a.is_correct).count();
            if correct != 1 {
                return Err(TestDetailError::CorrectAnswerCount {
                    task: index,
                    correct,
                });
            }
            tasks.push(Task {
                question: task.question,
                duration_secs: task.duration,
                answers: task.answers,
            });
        }

        Ok(Self { id, tasks })
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Shuffle the task order and, independently, every task's answers.
    #[must_use]
    pub fn into_shuffled_tasks<R: Rng + ?Sized>(self, rng: &mut R) -> Vec<Task> {
        let mut tasks = self.tasks;
        tasks.shuffle(rng);
        for task in &mut tasks {
            task.shuffle_answers(rng);
        }
        tasks
    }
}
