#![forbid(unsafe_code)]

pub mod model;
pub mod session;

pub use session::{
    AnswerMark, FinishedAttempt, QuizSession, SessionEffect, SessionEvent, SessionStateError,
    SessionStatus, Transition,
};
