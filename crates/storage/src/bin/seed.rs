use std::fmt;

use assess_core::model::{
    AssessmentDefinition, AssessmentId, AssessmentSettings, QuestionDraft, QuestionId,
    QuestionKind,
};
use chrono::{DateTime, Utc};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    assessment_id: AssessmentId,
    title: String,
    time_limit_minutes: Option<u32>,
    passing_score: Option<u8>,
    max_attempts: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAssessmentId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAssessmentId { raw } => {
                write!(f, "invalid --assessment-id value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("ASSESS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut assessment_id = std::env::var("ASSESS_ASSESSMENT_ID")
            .ok()
            .and_then(|value| value.parse::<AssessmentId>().ok())
            .unwrap_or_else(|| AssessmentId::new(1));
        let mut title = "Rust Fundamentals".to_string();
        let mut time_limit_minutes = Some(10);
        let mut passing_score = Some(70);
        let mut max_attempts = 3;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--assessment-id" => {
                    let value = require_value(&mut args, "--assessment-id")?;
                    assessment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAssessmentId { raw: value.clone() })?;
                }
                "--title" => title = require_value(&mut args, "--title")?,
                "--time-limit" => {
                    let value = require_value(&mut args, "--time-limit")?;
                    time_limit_minutes = match value.as_str() {
                        "none" => None,
                        _ => Some(parse_number("--time-limit", value)?),
                    };
                }
                "--passing-score" => {
                    let value = require_value(&mut args, "--passing-score")?;
                    passing_score = match value.as_str() {
                        "none" => None,
                        _ => Some(parse_number("--passing-score", value)?),
                    };
                }
                "--max-attempts" => {
                    let value = require_value(&mut args, "--max-attempts")?;
                    max_attempts = parse_number("--max-attempts", value)?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            assessment_id,
            title,
            time_limit_minutes,
            passing_score,
            max_attempts,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --features seed --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --assessment-id <id>      Assessment id to upsert (default: 1)");
    eprintln!("  --title <text>            Assessment title (default: Rust Fundamentals)");
    eprintln!("  --time-limit <min|none>   Time limit in minutes (default: 10)");
    eprintln!("  --passing-score <pct|none> Passing score percent (default: 70)");
    eprintln!("  --max-attempts <n>        Attempts allowed per user (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ASSESS_DB_URL, ASSESS_ASSESSMENT_ID, ASSESS_LOG");
}

fn sample_questions() -> Vec<QuestionDraft> {
    let mc = |text: &str, choices: &[&str], answer: &str| QuestionDraft {
        text: text.to_string(),
        kind: QuestionKind::MultipleChoice,
        choices: choices.iter().map(|c| (*c).to_string()).collect(),
        correct_answer: answer.to_string(),
        points: 1,
    };

    vec![
        mc(
            "Which keyword declares a mutable binding?",
            &["let", "let mut", "mut", "var"],
            "let mut",
        ),
        mc(
            "Which trait enables the `?` operator to convert errors?",
            &["Into", "From", "AsRef", "Display"],
            "From",
        ),
        QuestionDraft {
            text: "A `&mut T` reference may coexist with other references to the same value."
                .into(),
            kind: QuestionKind::TrueFalse,
            choices: Vec::new(),
            correct_answer: "false".into(),
            points: 1,
        },
        QuestionDraft {
            text: "Name the smart pointer used for shared ownership across threads.".into(),
            kind: QuestionKind::ShortAnswer,
            choices: Vec::new(),
            correct_answer: "Arc".into(),
            points: 2,
        },
        QuestionDraft {
            text: "In one word, what does the borrow checker enforce?".into(),
            kind: QuestionKind::Essay,
            choices: Vec::new(),
            correct_answer: "Ownership".into(),
            points: 2,
        },
    ]
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let questions = sample_questions()
        .into_iter()
        .zip(1_u64..)
        .map(|(draft, id)| draft.validate(QuestionId::new(id)))
        .collect::<Result<Vec<_>, _>>()?;
    let settings =
        AssessmentSettings::new(args.time_limit_minutes, args.passing_score, args.max_attempts)?;
    let definition = AssessmentDefinition::new(
        args.assessment_id,
        args.title.clone(),
        Some("Ownership, borrowing, and error handling basics.".into()),
        questions,
        settings,
        now,
    )?;

    storage.assessments.upsert_assessment(&definition).await?;
    tracing::info!(assessment_id = %definition.id(), "seeded assessment");

    println!(
        "Seeded assessment {} ({} questions, {} points) into {}",
        definition.id(),
        definition.question_count(),
        definition.total_points(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ASSESS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
