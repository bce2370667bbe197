use std::fmt;

use assess_core::model::{AssessmentId, AssessmentSettings, UserId};
use assess_core::scoring::round_score;
use services::{AppServices, Clock, Difficulty, GenerationRequest, SessionConfig};
use tracing_subscriber::EnvFilter;

mod take;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAssessmentId { raw: String },
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    MissingTopic,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAssessmentId { raw } => {
                write!(f, "invalid --assessment-id value: {raw}")
            }
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value (expected UUID): {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => write!(f, "invalid --difficulty value: {raw}"),
            ArgsError::MissingTopic => write!(f, "generate requires --topic"),
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

/// `none` disables an optional setting.
fn parse_optional<T: std::str::FromStr>(
    flag: &'static str,
    raw: String,
) -> Result<Option<T>, ArgsError> {
    if raw.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_number(flag, raw).map(Some)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take     [--db <sqlite_url>] [--assessment-id <id>] [--user <uuid>]");
    eprintln!("  cargo run -p app -- history  [--db <sqlite_url>] [--assessment-id <id>] [--user <uuid>] [--limit <n>]");
    eprintln!("  cargo run -p app -- list     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- generate --topic <text> [--difficulty <level>] [--count <n>]");
    eprintln!("                               [--title <text>] [--time-limit <min|none>]");
    eprintln!("                               [--passing-score <pct|none>] [--max-attempts <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --assessment-id 1");
    eprintln!("  --user a fresh random id (printed at startup)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ASSESS_DB_URL, ASSESS_ASSESSMENT_ID, ASSESS_USER_ID, ASSESS_LOG");
    eprintln!("  ASSESS_SUBMIT_TIMEOUT_SECS, ASSESS_SUBMIT_RETRY_SECS");
    eprintln!("  ASSESS_AI_API_KEY, ASSESS_AI_BASE_URL, ASSESS_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    History,
    List,
    Generate,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "history" => Some(Self::History),
            "list" => Some(Self::List),
            "generate" => Some(Self::Generate),
            _ => None,
        }
    }
}

struct GenerateArgs {
    topic: String,
    difficulty: Difficulty,
    count: usize,
    title: Option<String>,
    time_limit_minutes: Option<u32>,
    passing_score: Option<u8>,
    max_attempts: u32,
}

impl Default for GenerateArgs {
    fn default() -> Self {
        Self {
            topic: String::new(),
            difficulty: Difficulty::default(),
            count: 5,
            title: None,
            time_limit_minutes: None,
            passing_score: Some(70),
            max_attempts: 3,
        }
    }
}

struct Args {
    db_url: String,
    assessment_id: AssessmentId,
    user_id: Option<UserId>,
    limit: u32,
    generate: GenerateArgs,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("ASSESS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut assessment_id = std::env::var("ASSESS_ASSESSMENT_ID")
            .ok()
            .and_then(|value| value.parse::<AssessmentId>().ok())
            .unwrap_or_else(|| AssessmentId::new(1));
        let mut user_id = std::env::var("ASSESS_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut limit = 20;
        let mut generate = GenerateArgs::default();

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                (Command::Take | Command::History, "--assessment-id") => {
                    let value = require_value(args, "--assessment-id")?;
                    assessment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAssessmentId { raw: value.clone() })?;
                }
                (Command::Take | Command::History, "--user") => {
                    let value = require_value(args, "--user")?;
                    user_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?,
                    );
                }
                (Command::History, "--limit") => {
                    limit = parse_number("--limit", require_value(args, "--limit")?)?;
                }
                (Command::Generate, "--topic") => generate.topic = require_value(args, "--topic")?,
                (Command::Generate, "--difficulty") => {
                    let value = require_value(args, "--difficulty")?;
                    generate.difficulty = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw: value.clone() })?;
                }
                (Command::Generate, "--count") => {
                    generate.count = parse_number("--count", require_value(args, "--count")?)?;
                }
                (Command::Generate, "--title") => {
                    generate.title = Some(require_value(args, "--title")?);
                }
                (Command::Generate, "--time-limit") => {
                    generate.time_limit_minutes =
                        parse_optional("--time-limit", require_value(args, "--time-limit")?)?;
                }
                (Command::Generate, "--passing-score") => {
                    generate.passing_score =
                        parse_optional("--passing-score", require_value(args, "--passing-score")?)?;
                }
                (Command::Generate, "--max-attempts") => {
                    generate.max_attempts =
                        parse_number("--max-attempts", require_value(args, "--max-attempts")?)?;
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Generate && generate.topic.trim().is_empty() {
            return Err(ArgsError::MissingTopic);
        }

        Ok(Self {
            db_url,
            assessment_id,
            user_id,
            limit,
            generate,
        })
    }

    fn user_or_random(&self) -> UserId {
        self.user_id.unwrap_or_else(|| {
            let id = UserId::random();
            eprintln!("No --user given; using {id}. Pass it again to keep your attempt history.");
            id
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn list(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let assessments = services.sessions().list_assessments(100).await?;
    if assessments.is_empty() {
        println!("No assessments yet. Run the seed binary or `generate` first.");
        return Ok(());
    }
    for definition in assessments {
        let settings = definition.settings();
        let limit = settings
            .time_limit_minutes()
            .map_or_else(|| "untimed".to_string(), |m| format!("{m} min"));
        println!(
            "{:>4}  {}  ({} questions, {}, {} attempts)",
            definition.id(),
            definition.title(),
            definition.question_count(),
            limit,
            settings.max_attempts()
        );
    }
    Ok(())
}

async fn history(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = args.user_or_random();
    let history = services
        .history()
        .history(args.assessment_id, user_id, args.limit)
        .await?;

    println!(
        "Assessment {}: {} of {} attempts used",
        history.assessment_id, history.used_attempts, history.max_attempts
    );
    for attempt in &history.attempts {
        let score = attempt
            .score()
            .map_or_else(|| "-".to_string(), |s| format!("{:.2}%", round_score(s)));
        let when = attempt
            .submitted_at()
            .unwrap_or_else(|| attempt.started_at())
            .format("%Y-%m-%d %H:%M");
        println!(
            "  #{:<3} {:<12} {:>8}  {}",
            attempt.number(),
            attempt.status().as_str(),
            score,
            when
        );
    }
    if let Some(best) = history.best_score() {
        println!("Best score: {:.2}%", round_score(best));
    }
    Ok(())
}

async fn generate(services: &AppServices, args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = GenerationRequest::new(args.topic, args.difficulty, args.count)?;
    let settings =
        AssessmentSettings::new(args.time_limit_minutes, args.passing_score, args.max_attempts)?;
    let id = services
        .authoring()
        .generate_assessment(&request, args.title, settings)
        .await?;
    println!("Created assessment {id} on {}", request.topic);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Bare flags default to taking an assessment.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if argv.first().is_some_and(|first| !first.starts_with("--")) {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue; services stay storage-agnostic.
    prepare_sqlite_file(&args.db_url)?;
    let services =
        AppServices::new_sqlite(&args.db_url, Clock::default_clock(), SessionConfig::from_env())
            .await?;

    match cmd {
        Command::Take => {
            let user_id = args.user_or_random();
            take::run(&services, args.assessment_id, user_id).await
        }
        Command::History => history(&services, &args).await,
        Command::List => list(&services).await,
        Command::Generate => generate(&services, args.generate).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("ASSESS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
