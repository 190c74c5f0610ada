use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quiz_core::model::{OPTION_COUNT, SessionConfigDraft, SessionMode};
use services::{
    Advance, AnswerOutcome, NoticeLevel, NoticeReceiver, Phase, SessionDriver, SessionView,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

enum Action {
    Choose(u8),
    Next,
    Back,
    End,
    Quit,
    Help,
}

fn parse_action(line: &str) -> Option<Action> {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        "n" | "next" => Some(Action::Next),
        "p" | "prev" | "back" => Some(Action::Back),
        "e" | "end" => Some(Action::End),
        "q" | "quit" => Some(Action::Quit),
        "h" | "help" | "?" => Some(Action::Help),
        "a" | "b" | "c" | "d" => line.bytes().next().map(|b| Action::Choose(b - b'a')),
        other => other
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=4).contains(n))
            .map(|n| Action::Choose(n - 1)),
    }
}

fn print_help() {
    println!("  1-4 or a-d  choose an option");
    println!("  n           next question");
    println!("  p           previous question");
    println!("  e           end the session now");
    println!("  q           quit without scoring");
}

fn render(view: &SessionView) {
    let Some(question) = &view.question else {
        return;
    };
    println!();
    match &view.clock {
        Some(clock) => println!("Question {}/{}  [{clock}]", question.index + 1, view.total),
        None => println!("Question {}/{}", question.index + 1, view.total),
    }
    println!("{}", question.text);
    for (i, option) in question.options.iter().enumerate().take(OPTION_COUNT) {
        let marker = if question.chosen == u8::try_from(i).ok() {
            '*'
        } else {
            ' '
        };
        println!(" {marker}{}) {option}", i + 1);
    }
}

fn render_reveal(view: &SessionView) {
    let Some(question) = &view.question else {
        return;
    };
    let (Some(correct), Some(explanation)) = (question.correct_option, &question.explanation)
    else {
        return;
    };
    if question.chosen == Some(correct) {
        println!("Correct!");
    } else {
        println!(
            "Incorrect. The answer is {}) {}",
            correct + 1,
            question.options[usize::from(correct)]
        );
    }
    println!("{explanation}");
}

/// Redraw the countdown in place on the prompt line.
fn render_clock(clock: &str) {
    print!("\r[{clock}] > ");
    let _ = std::io::stdout().flush();
}

fn drain_notices(notices: &mut NoticeReceiver) {
    while let Ok(notice) = notices.try_recv() {
        match notice.level {
            NoticeLevel::Info => println!("note: {}", notice.message),
            NoticeLevel::Error => eprintln!("warning: {}", notice.message),
        }
    }
}

/// Run one interactive session on stdin/stdout.
pub async fn run(
    driver: SessionDriver,
    draft: SessionConfigDraft,
    mut notices: NoticeReceiver,
    report: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let timed = draft.mode == SessionMode::Timed;
    driver.update_draft(draft).await?;

    println!("Preparing questions...");
    let view = driver.start().await?;
    if view.phase != Phase::Active {
        let message = view
            .last_error
            .unwrap_or_else(|| "the session could not be started".into());
        return Err(message.into());
    }
    print_help();

    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    let mut shown: Option<(usize, Option<u8>)> = None;

    loop {
        let view = driver.view().await;
        if view.phase == Phase::Finished {
            if timed && view.remaining_secs == Some(0) {
                println!("\nTime is up.");
            }
            break;
        }
        if view.phase != Phase::Active {
            println!("Session closed.");
            return Ok(());
        }

        let current = view.question.as_ref().map(|q| (q.index, q.chosen));
        if current != shown {
            render(&view);
            shown = current;
        }
        if let Some(clock) = &view.clock {
            render_clock(clock);
        }

        let line = tokio::select! {
            line = input.next_line() => line?,
            () = tokio::time::sleep(Duration::from_secs(1)), if timed => continue,
        };
        let Some(line) = line else {
            driver.abort().await;
            return Ok(());
        };

        match parse_action(&line) {
            Some(Action::Choose(choice)) => match driver.select_option(choice).await {
                Ok(AnswerOutcome::Revealed { .. }) => render_reveal(&driver.view().await),
                Ok(AnswerOutcome::Recorded { .. }) => {}
                Err(err) => println!("{err}"),
            },
            Some(Action::Next) => match driver.advance().await {
                Ok(Advance::Moved { .. }) => shown = None,
                Ok(Advance::Finished(_)) => {}
                Err(err) => println!("{err}"),
            },
            Some(Action::Back) => match driver.retreat().await {
                Ok(_) => shown = None,
                Err(err) => println!("{err}"),
            },
            Some(Action::End) => {
                if let Err(err) = driver.end_early().await {
                    println!("{err}");
                }
            }
            Some(Action::Quit) => {
                driver.abort().await;
                println!("Session discarded.");
                return Ok(());
            }
            Some(Action::Help) => print_help(),
            None => println!("unrecognised input, type h for help"),
        }
        drain_notices(&mut notices);
    }

    print_summary(&driver).await;
    drain_notices(&mut notices);

    if let Some(path) = report {
        write_report(&driver, &path).await?;
    }
    Ok(())
}

async fn print_summary(driver: &SessionDriver) {
    let view = driver.view().await;
    if let Some(score) = view.score {
        println!();
        println!(
            "Score: {}% ({}/{} correct)",
            score.score(),
            score.correct(),
            score.total()
        );
    }
    for item in driver.review().await {
        let mark = if item.is_correct { "ok " } else { "-- " };
        println!("{mark}{}. {}", item.index + 1, item.text);
        if !item.is_correct {
            let chosen = item.chosen.as_deref().unwrap_or("(no answer)");
            println!("     yours: {chosen}");
            println!("     answer: {}", item.correct);
        }
    }
}

async fn write_report(
    driver: &SessionDriver,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(record) = driver.result_preview().await else {
        return Ok(());
    };
    let target = if tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        path.join(record.report_file_name())
    } else {
        path.to_path_buf()
    };
    tokio::fs::write(&target, record.report()).await?;
    println!("Report written to {}", target.display());
    Ok(())
}
