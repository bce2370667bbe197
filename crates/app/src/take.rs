//! Line-oriented terminal front end for one assessment session.

use assess_core::model::{AssessmentId, QuestionKind, SubmissionResult, UserId};
use assess_core::scoring::round_score;
use services::{AppServices, SessionError, SessionHandle, SessionPhase, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn print_commands(phase: SessionPhase) {
    if phase == SessionPhase::Instructions {
        println!("Commands: start, quit");
        return;
    }
    println!("Commands:");
    println!("  next | prev | goto <n>     move between questions");
    println!("  answer <text>              answer the current question");
    println!("  pick <n>                   choose option n of the current question");
    println!("  status                     show progress and time left");
    println!("  submit                     grade and record the attempt");
    println!("  quit                       leave without submitting");
}

fn print_instructions(view: &SessionView) {
    println!("== {} ==", view.title);
    if let Some(description) = &view.description {
        println!("{description}");
    }
    println!("Questions: {}", view.question_count);
    match view.time_limit_minutes {
        Some(minutes) => println!("Time limit: {minutes} min (submits automatically)"),
        None => println!("Time limit: none"),
    }
    if let Some(score) = view.passing_score {
        println!("Passing score: {score}%");
    }
    println!("Attempts allowed: {}", view.max_attempts);
    println!();
    print_commands(view.phase);
}

fn print_question(view: &SessionView) {
    let Some(question) = &view.current else {
        return;
    };
    let clock = view
        .remaining_display
        .as_deref()
        .map(|t| format!("  [{t} left]"))
        .unwrap_or_default();
    println!();
    println!(
        "Question {}/{} ({} pt){clock}",
        question.index + 1,
        view.question_count,
        question.points
    );
    println!("{}", question.text);
    match question.kind {
        QuestionKind::ShortAnswer | QuestionKind::Essay => {}
        _ => {
            for (n, option) in question.options.iter().enumerate() {
                println!("  {}. {option}", n + 1);
            }
        }
    }
    if let Some(answer) = &question.answer {
        println!("Your answer: {answer}");
    }
}

fn print_status(view: &SessionView) {
    println!(
        "{}: answered {}{}",
        view.phase,
        view.progress_label(),
        view.remaining_display
            .as_deref()
            .map(|t| format!(", {t} left"))
            .unwrap_or_default()
    );
    if view.time_expired {
        println!("Time is up; answers are locked.");
    }
    if let Some(err) = &view.last_error {
        println!("Last submission failed: {err}");
    }
}

fn print_result(result: &SubmissionResult) {
    println!();
    println!(
        "Score: {:.2}% ({}/{} points, {}/{} correct)",
        round_score(result.score),
        result.points_earned,
        result.points_possible,
        result.correct_count(),
        result.total_questions()
    );
    match result.passed {
        Some(true) => println!("Result: passed"),
        Some(false) => println!("Result: failed"),
        None => {}
    }
    for (n, outcome) in result.outcomes.iter().enumerate() {
        let mark = if outcome.is_correct { "ok" } else { "x " };
        let answer = if outcome.answer.is_empty() {
            "(no answer)"
        } else {
            outcome.answer.as_str()
        };
        println!("  [{mark}] Q{}: {answer}", n + 1);
    }
}

/// Parse a 1-based position typed by the user.
fn parse_position(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}

async fn handle_line(handle: &SessionHandle, line: &str) -> Result<Flow, SessionError> {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" | "?" => print_commands(handle.phase().await),
        "start" => {
            let view = handle.start().await?;
            if let Some(number) = view.attempt_number {
                println!("Attempt {number} of {} started.", view.max_attempts);
            }
            print_commands(view.phase);
            print_question(&view);
        }
        "next" | "n" => {
            handle.next().await?;
            print_question(&handle.view().await);
        }
        "prev" | "p" => {
            handle.previous().await?;
            print_question(&handle.view().await);
        }
        "goto" | "g" => {
            let Some(index) = parse_position(rest) else {
                println!("goto expects a question number starting at 1");
                return Ok(Flow::Continue);
            };
            handle.go_to(index).await?;
            print_question(&handle.view().await);
        }
        "answer" | "a" => {
            handle.set_current_answer(rest).await?;
            println!("Saved.");
        }
        "pick" => {
            let view = handle.view().await;
            let option = view
                .current
                .as_ref()
                .zip(parse_position(rest))
                .and_then(|(q, n)| q.options.get(n).cloned());
            match option {
                Some(option) => {
                    handle.set_current_answer(option.clone()).await?;
                    println!("Saved: {option}");
                }
                None => println!("pick expects an option number shown above"),
            }
        }
        "status" | "s" => print_status(&handle.view().await),
        "submit" => match handle.submit().await? {
            Some(result) => {
                print_result(&result);
                return Ok(Flow::Quit);
            }
            None => println!("A submission is already in progress."),
        },
        other => println!("unknown command: {other} (try `help`)"),
    }
    Ok(Flow::Continue)
}

/// Reacts to phase changes the countdown causes while the user is idle.
async fn on_phase_change(handle: &SessionHandle, phase: SessionPhase) -> Flow {
    match phase {
        SessionPhase::Submitting => {
            println!();
            println!("Submitting...");
            Flow::Continue
        }
        SessionPhase::Completed => {
            if let Some(result) = handle.result().await {
                print_result(&result);
            }
            Flow::Quit
        }
        SessionPhase::InProgress => {
            let view = handle.view().await;
            if let Some(err) = &view.last_error {
                println!("Automatic submission failed ({err}); retrying shortly.");
            }
            Flow::Continue
        }
        SessionPhase::Instructions => Flow::Continue,
    }
}

/// Run an interactive session until it completes or the user quits.
///
/// # Errors
///
/// Returns an error if the assessment cannot be loaded or stdin fails.
pub async fn run(
    services: &AppServices,
    assessment_id: AssessmentId,
    user_id: UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = services
        .sessions()
        .open_session(assessment_id, user_id)
        .await?;
    print_instructions(&handle.view().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut phases = handle.subscribe();

    loop {
        let flow = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let flow = match handle_line(&handle, &line).await {
                        Ok(flow) => flow,
                        Err(err) => {
                            println!("{err}");
                            if err.is_retryable() {
                                println!("You can try again.");
                            }
                            Flow::Continue
                        }
                    };
                    // Changes caused by the command itself were already reported.
                    let phase = *phases.borrow_and_update();
                    if flow == Flow::Continue && phase == SessionPhase::Completed {
                        on_phase_change(&handle, phase).await
                    } else {
                        flow
                    }
                }
                None => Flow::Quit,
            },
            changed = phases.changed() => match changed {
                Ok(()) => {
                    let phase = *phases.borrow_and_update();
                    on_phase_change(&handle, phase).await
                }
                Err(_) => Flow::Quit,
            },
        };
        if flow == Flow::Quit {
            break;
        }
    }

    if handle.phase().await == SessionPhase::InProgress {
        tracing::info!(%assessment_id, "left without submitting; the attempt still counts");
        println!("Left without submitting. This attempt still counts toward the limit.");
    }
    Ok(())
}
