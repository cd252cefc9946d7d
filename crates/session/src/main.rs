//! `liftlog-session` -- log one workout from the terminal.
//!
//! Loads a prefill document, resumes any stored draft for its template and
//! reads commands from stdin until the workout is submitted, cancelled or
//! the input ends. Pending edits are flushed to the draft on exit.
//!
//! ```text
//! liftlog-session <prefill.json>
//! ```
//!
//! # Environment variables
//!
//! | Variable                 | Default                 | Description                          |
//! |--------------------------|-------------------------|--------------------------------------|
//! | `LIFTLOG_API_URL`        | `http://localhost:4321` | Base URL of the workout API          |
//! | `LIFTLOG_DRAFT_DIR`      | `data/drafts`           | Directory holding draft files        |
//! | `DRAFT_SAVE_DEBOUNCE_MS` | `2000`                  | Quiet period before a draft is saved |
//! | `SUBMIT_TIMEOUT_SECS`    | `30`                    | HTTP timeout for submission          |

use std::sync::Arc;

use anyhow::{bail, Context};
use liftlog_core::prefill::WorkoutPrefill;
use liftlog_core::workout::{SetField, Session};
use liftlog_session::{
    DraftStore, EngineContext, FileDraftBackend, HttpSubmissionTransport, SessionConfig,
    SessionEngine, SessionOrigin, SubmitError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  show                                   print the session
  set <exercise> <set> <reps|weight> <value|->
                                         edit one field (- clears it)
  submit                                 validate and send the workout
  dismiss                                hide the submission error
  cancel                                 abandon the workout and its draft
  quit                                   save the draft and exit";

enum Flow {
    Continue,
    Exit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: liftlog-session <prefill.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read prefill {path}"))?;
    let prefill: WorkoutPrefill =
        serde_json::from_str(&raw).with_context(|| format!("invalid prefill document {path}"))?;

    let config = SessionConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        draft_dir = %config.draft_dir.display(),
        debounce_ms = config.save_debounce.as_millis() as u64,
        "Starting liftlog-session",
    );

    let store = DraftStore::new(Arc::new(FileDraftBackend::new(config.draft_dir.clone())));
    let transport = HttpSubmissionTransport::new(config.api_url.clone(), config.submit_timeout)
        .context("failed to build HTTP client")?;
    let context = EngineContext::from_config(&config, store, Arc::new(transport));

    let engine = SessionEngine::initialize(&prefill, context).await;
    if engine.origin() == SessionOrigin::Draft {
        println!("Resumed unsaved workout draft.");
    }
    print_session(&engine.snapshot());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(&engine, line.trim()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => println!("error: {e:#}"),
        }
    }

    if engine.flush().await? {
        tracing::info!(template_id = %engine.template_id(), "Draft saved on exit");
    }
    Ok(())
}

async fn run_command(engine: &SessionEngine, line: &str) -> anyhow::Result<Flow> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => {}
        ["show"] => {
            print_session(&engine.snapshot());
            if let Some(message) = engine.submit_error() {
                println!("! {message}");
            }
        }
        ["set", exercise, set, field, value] => {
            let exercise: usize = exercise.parse().context("exercise must be an index")?;
            let set: usize = set.parse().context("set must be an index")?;
            let field: SetField = field.parse()?;
            let value = match *value {
                "-" => None,
                v => Some(v.parse::<f64>().context("value must be a number or -")?),
            };
            let update = engine.update_set(exercise, set, field, value)?;
            match update.error {
                Some(error) => println!("  {error}"),
                None if update.exercise_completed => println!("  exercise complete"),
                None => println!("  ok"),
            }
        }
        ["submit"] => match engine.submit().await {
            Ok(response) => {
                println!("Workout saved ({}).", response.id);
                for pb in &response.personal_bests_updated {
                    println!(
                        "  new best: {} {} -> {} kg",
                        pb.exercise_name, pb.previous_weight, pb.new_weight
                    );
                }
                return Ok(Flow::Exit);
            }
            Err(SubmitError::Invalid { invalid_sets }) => {
                println!("{invalid_sets} set(s) need fixing:");
                print_session(&engine.snapshot());
            }
            Err(SubmitError::Rejected { .. }) => {
                if let Some(message) = engine.submit_error() {
                    println!("! {message}");
                }
                print_session(&engine.snapshot());
            }
            Err(e) => {
                if let Some(message) = engine.submit_error() {
                    println!("! {message}");
                }
                return Err(e.into());
            }
        },
        ["dismiss"] => engine.dismiss_submit_error(),
        ["cancel"] => {
            engine.cancel().await?;
            println!("Workout discarded.");
            return Ok(Flow::Exit);
        }
        ["quit"] | ["exit"] => return Ok(Flow::Exit),
        ["help"] => println!("{HELP}"),
        _ => bail!("unrecognized command; type `help`"),
    }
    Ok(Flow::Continue)
}

fn print_session(session: &Session) {
    println!("{} ({})", session.template_name, session.logged_at.format("%Y-%m-%d %H:%M"));
    for (ei, exercise) in session.exercises.iter().enumerate() {
        let mark = if exercise.completed() { "x" } else { " " };
        println!("[{mark}] {ei}: {}", exercise.exercise_name);
        for (si, set) in exercise.sets.iter().enumerate() {
            println!(
                "      {si}: {:>5} reps  {:>7} kg  {}",
                display_value(set.reps),
                display_value(set.weight),
                set.error.as_deref().unwrap_or(""),
            );
        }
    }
}

fn display_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}
