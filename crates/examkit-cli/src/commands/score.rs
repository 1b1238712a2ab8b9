//! The `examkit score` command.
//!
//! Drives a real [`ExamSession`] over an answer sheet: the sheet's answers
//! are entered, the clock is advanced by the reported time taken (which
//! auto-submits if the time ran out), and the session is then confirmed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use examkit_backends::config::{create_backend, load_config_from, Backend};
use examkit_backends::LocalBackend;
use examkit_core::parser::{parse_answer_sheet, parse_exam_document, AnswerSheet};
use examkit_core::report::{SubmissionResult, WritingRoute};
use examkit_core::{ExamSession, SessionOptions, SessionPhase, SubmitOutcome};

pub struct ScoreArgs {
    pub exam: Option<PathBuf>,
    pub test_id: Option<String>,
    pub answers: PathBuf,
    pub practice_step: Option<usize>,
    pub writing_route: String,
    pub backend: Option<String>,
    pub config: Option<PathBuf>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub save: bool,
}

pub async fn execute(args: ScoreArgs) -> Result<()> {
    let route = parse_route(&args.writing_route)?;
    anyhow::ensure!(
        matches!(args.format.as_str(), "text" | "json" | "markdown"),
        "unknown format '{}' (expected text, json, or markdown)",
        args.format
    );

    let config = load_config_from(args.config.as_deref())?;
    let sheet = parse_answer_sheet(&args.answers)?;

    let (test_id, backend) = match (&args.exam, &args.test_id) {
        (Some(path), _) => {
            let doc = parse_exam_document(path)?;
            let test_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "exam".to_string());
            let local = LocalBackend::in_memory().with_document(&test_id, doc);
            (test_id, Backend::shared("local", local))
        }
        (None, Some(test_id)) => {
            let name = args.backend.as_deref().unwrap_or(&config.default_backend);
            let backend = create_backend(name, &config.backend(name)?)?;
            (test_id.clone(), backend)
        }
        (None, None) => anyhow::bail!("either --exam or --test-id is required"),
    };

    tracing::debug!(test_id = %test_id, backend = %backend.name, "opening session");
    let options = SessionOptions {
        practice_step: args.practice_step,
        warning_threshold_secs: config.warning_threshold_secs,
        ..SessionOptions::default()
    };
    let session = ExamSession::load(
        &test_id,
        backend.content.as_ref(),
        backend.grading.clone(),
        options,
    )
    .await?;

    fill_answers(&session, &sheet)?;
    let result = run_to_completion(&session, &sheet, route).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "markdown" => print!("{}", result.to_markdown()),
        _ => print_result(&session, &result),
    }

    let output = args
        .output
        .clone()
        .or_else(|| args.save.then(|| config.output_dir.clone()));
    if let Some(dir) = output {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        let path = dir.join(format!("{test_id}-{timestamp}.json"));
        result.save_json(&path)?;
        eprintln!("Result saved to: {}", path.display());
    }

    Ok(())
}

fn parse_route(s: &str) -> Result<WritingRoute> {
    match s {
        "standard" => Ok(WritingRoute::Standard),
        "ai" => Ok(WritingRoute::Ai),
        other => anyhow::bail!("unknown writing route '{other}' (expected standard or ai)"),
    }
}

fn fill_answers(session: &ExamSession, sheet: &AnswerSheet) -> Result<()> {
    let slots = session.slots().len();
    anyhow::ensure!(
        sheet.answers.len() <= slots,
        "answer sheet has {} answers but the exam has {slots} slots",
        sheet.answers.len()
    );
    let tasks = session.document().writing.len();
    anyhow::ensure!(
        sheet.writing.len() <= tasks,
        "answer sheet has {} essays but the exam has {tasks} writing tasks",
        sheet.writing.len()
    );

    for (i, answer) in sheet.answers.iter().enumerate() {
        if !answer.trim().is_empty() {
            session.set_answer(i, answer.as_str())?;
        }
    }
    for (i, essay) in sheet.writing.iter().enumerate() {
        session.set_writing_answer(i, essay.as_str())?;
    }
    Ok(())
}

async fn run_to_completion(
    session: &ExamSession,
    sheet: &AnswerSheet,
    route: WritingRoute,
) -> Result<SubmissionResult> {
    for _ in 0..sheet.time_taken_secs.unwrap_or(0) {
        if session.tick().await.is_none() {
            break;
        }
    }

    let state = session.state();
    let outcome = match state.phase {
        SessionPhase::Active => session.confirm_submit().await?,
        SessionPhase::Error => {
            let reason = state.last_error.unwrap_or_default();
            anyhow::bail!("automatic submission at time-out failed: {reason}");
        }
        _ => session
            .result()
            .map(SubmitOutcome::Submitted)
            .context("session ended without a result")?,
    };

    match outcome {
        SubmitOutcome::Submitted(result) => Ok(result),
        SubmitOutcome::AwaitingRoute => {
            match session.choose_writing_scoring_route(route).await? {
                SubmitOutcome::Submitted(result) => Ok(result),
                other => anyhow::bail!("unexpected submission outcome: {other:?}"),
            }
        }
        SubmitOutcome::InFlight => anyhow::bail!("a submission is already in flight"),
    }
}

fn print_result(session: &ExamSession, result: &SubmissionResult) {
    let title = &session.document().title;
    println!(
        "{}{}",
        if title.is_empty() { session.test_id() } else { title.as_str() },
        if result.is_practice { " (practice)" } else { "" }
    );

    if !result.score_visible() {
        println!("Submitted for grading (submission {}).", result.submission_id);
        println!("Scores will be available once reviewed.");
        return;
    }

    if !result.question_review.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Q", "Type", "Your answer", "Correct answer", "Result"]);
        for r in &result.question_review {
            let mark = if r.is_correct {
                "correct"
            } else if r.is_answered() {
                "wrong"
            } else {
                "skipped"
            };
            table.add_row(vec![
                Cell::new(r.q_number),
                Cell::new(r.kind),
                Cell::new(&r.your_answer),
                Cell::new(&r.correct_answer),
                Cell::new(mark),
            ]);
        }
        println!("{table}");
    }

    println!(
        "Score: {}/{} ({} wrong, {} skipped)",
        result.score, result.total, result.wrong, result.skipped
    );
    if let Some(band) = result.band {
        println!("Band: {band:.1}");
    }
    if let Some(route) = result.route {
        println!("Writing route: {route}");
    }
    println!(
        "Time taken: {}m {:02}s",
        result.time_taken_secs / 60,
        result.time_taken_secs % 60
    );
}
