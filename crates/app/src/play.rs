use std::sync::Arc;

use anyhow::Result;
use quiz_core::model::TestSummary;
use quiz_core::{AnswerMark, SessionStatus};
use services::{AppServices, ChannelNavigator, EngineSnapshot, Route, SubmitOutcome};
use tokio::sync::mpsc;

/// What was last printed, so repeated snapshots do not reprint a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shown {
    status: SessionStatus,
    question: usize,
    remaining: u32,
    failed: bool,
}

enum Input {
    Answer(usize),
    Restart,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        "r" | "restart" => Input::Restart,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Input::Answer(n - 1),
            _ => Input::Unknown,
        },
    }
}

/// Forward stdin lines from a plain thread so a pending read never holds up runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Play one test interactively on stdin/stdout until it finishes or the user quits.
pub async fn run(services: &AppServices, summary: &TestSummary) -> Result<()> {
    let (navigator, mut routes) = ChannelNavigator::channel();
    let mut engine = services.start_session(Arc::new(navigator), summary);
    let mut snapshots = engine.subscribe();
    let mut input = stdin_lines();
    let mut shown: Option<Shown> = None;

    println!("== {} ==", summary.name());
    if !*engine.connectivity().borrow() {
        println!("(offline: your result will not be saved)");
    }
    println!("Type an answer number, `r` to restart or `q` to quit.");

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&snapshot, &mut shown);
            }
            route = routes.recv() => {
                if matches!(route, Some(Route::Results) | None) {
                    break;
                }
            }
            line = input.recv() => {
                let Some(line) = line else {
                    break;
                };
                match parse_input(&line) {
                    Input::Answer(index) => match engine.select_answer(index) {
                        Ok(true) => {}
                        Ok(false) => println!("(not accepting answers right now)"),
                        Err(err) => println!("{err}"),
                    },
                    Input::Restart => {
                        shown = None;
                        engine.restart();
                    }
                    Input::Quit => break,
                    Input::Unknown => println!("(enter a number, `r` or `q`)"),
                }
            }
        }
    }

    let last = engine.snapshot();
    render(&last, &mut shown);
    let finished = last.session.is_finished();
    engine.teardown();
    if finished {
        match engine.wait_for_submission().await {
            Some(SubmitOutcome::Sent) => println!("Result saved."),
            Some(SubmitOutcome::SkippedOffline) => println!("Offline: result not saved."),
            Some(SubmitOutcome::Failed) => println!("Could not save the result."),
            None => {}
        }
    }
    Ok(())
}

fn render(snapshot: &EngineSnapshot, shown: &mut Option<Shown>) {
    let session = &snapshot.session;
    let now = Shown {
        status: session.status(),
        question: session.question_number(),
        remaining: session.remaining_secs(),
        failed: snapshot.load_error.is_some(),
    };
    let previous = shown.replace(now);
    if previous == Some(now) {
        return;
    }
    let same_screen = previous.is_some_and(|p| {
        p.status == now.status && p.question == now.question && p.failed == now.failed
    });

    match session.status() {
        SessionStatus::Loading => {
            if let Some(err) = &snapshot.load_error {
                println!("Could not load the test: {err}. Type `r` to retry or `q` to quit.");
            } else if !same_screen {
                println!("Loading...");
            }
        }
        SessionStatus::AwaitingAnswer if same_screen => {
            if session.remaining_secs() <= 3 {
                println!("  {}s left", session.remaining_secs());
            }
        }
        SessionStatus::AwaitingAnswer => {
            let Some(task) = session.current_task() else {
                return;
            };
            println!();
            println!(
                "Question {}/{} ({}s): {}",
                session.question_number(),
                session.total(),
                session.remaining_secs(),
                task.question()
            );
            for (i, answer) in session.current_answers().iter().enumerate() {
                println!("  {}. {}", i + 1, answer.content);
            }
        }
        SessionStatus::Evaluating => {
            if session.selected_answer().is_none() {
                println!("Time's up!");
            }
            for (i, answer) in session.current_answers().iter().enumerate() {
                let mark = match session.answer_mark(i) {
                    AnswerMark::Neutral => continue,
                    AnswerMark::SelectedCorrect => "correct",
                    AnswerMark::SelectedWrong => "wrong",
                    AnswerMark::Revealed => "the right answer",
                };
                println!("  {}. {} <- {mark}", i + 1, answer.content);
            }
        }
        SessionStatus::Advancing => {}
        SessionStatus::Finished => {
            println!();
            println!("Score: {}/{}", session.count_correct(), session.total());
        }
    }
}
