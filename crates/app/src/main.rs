use std::fmt;
use std::time::Instant;

use drill_core::model::{DrillSessionId, DrillType, Perspective, Question, UserId};
use services::{
    AppServices, CheckAnswerRequest, Clock, DrillService, StartDrillRequest, StatsService,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

mod board;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { source: &'static str, raw: String },
    InvalidRounds { raw: String },
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { source, raw } => write!(f, "invalid {source} value: {raw}"),
            ArgsError::InvalidRounds { raw } => write!(f, "invalid --rounds value: {raw}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- drill [--db <sqlite_url>] [--user-id <id>] [--drill <type>]");
    eprintln!("                            [--input <method>] [--perspective <white|black>]");
    eprintln!("                            [--piece <kind>] [--rounds <n>] [--seed <n>]");
    eprintln!("  cargo run -p app -- stats [--db <sqlite_url>] [--user-id <id>] [--json]");
    eprintln!();
    eprintln!("Drill types: name_square, find_square, piece_movement, move_notation");
    eprintln!("Input methods: type, click, grid, board_click");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://chess-drill.sqlite3");
    eprintln!("  --user-id 1");
    eprintln!("  --rounds 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CHESS_DRILL_DB_URL, CHESS_DRILL_USER_ID, CHESS_DRILL_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Drill,
    Stats,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "drill" => Some(Self::Drill),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    user_id: UserId,
    start: StartDrillRequest,
    rounds: u32,
    seed: Option<u64>,
    json: bool,
    verbose: bool,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("CHESS_DRILL_DB_URL")
            .map_or_else(|| "sqlite://chess-drill.sqlite3".into(), normalize_sqlite_url);
        let mut user_id: Option<UserId> = None;
        let mut start = StartDrillRequest::default();
        let mut rounds: u32 = 10;
        let mut seed = None;
        let mut json = false;
        let mut verbose = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    let value = require_value(args, "--user-id")?;
                    user_id = Some(parse_user_id("--user-id", value)?);
                }
                "--drill" => start.drill_type = require_value(args, "--drill")?,
                "--input" => start.input_method = require_value(args, "--input")?,
                "--perspective" => start.perspective = require_value(args, "--perspective")?,
                "--piece" => start.piece_type = Some(require_value(args, "--piece")?),
                "--rounds" => {
                    let value = require_value(args, "--rounds")?;
                    rounds = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidRounds { raw: value })?;
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    seed = Some(
                        value
                            .parse::<u64>()
                            .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?,
                    );
                }
                "--json" => json = true,
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let user_id = match user_id {
            Some(id) => id,
            None => env("CHESS_DRILL_USER_ID")
                .map(|value| parse_user_id("CHESS_DRILL_USER_ID", value))
                .transpose()?
                .unwrap_or_else(|| UserId::new(1)),
        };

        Ok(Self {
            db_url,
            user_id,
            start,
            rounds,
            seed,
            json,
            verbose,
        })
    }
}

fn parse_user_id(source: &'static str, raw: String) -> Result<UserId, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidUserId { source, raw })
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

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("CHESS_DRILL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| format!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}

fn instructions(question: &Question) -> String {
    match question.drill_type {
        DrillType::NameSquare => "Name the marked square:".to_owned(),
        DrillType::FindSquare => format!("Find {} and type its square:", question.prompt),
        DrillType::PieceMovement | DrillType::MoveNotation => {
            format!("{} Type the square it stands on:", question.prompt)
        }
    }
}

async fn run_drill(
    drills: &DrillService,
    args: &Args,
    perspective: Perspective,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = drills.start_drill(args.user_id, args.start.clone()).await?;
    let session_id: DrillSessionId = started.session_id;
    let drill_type = started.question.drill_type;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut question = started.question;

    let banner = format!("Session {session_id}: {drill_type}. Empty line or q to stop.\n");
    stdout.write_all(banner.as_bytes()).await?;

    for round in 1..=args.rounds {
        let text = format!(
            "\n[{round}/{}]\n{}{}\n> ",
            args.rounds,
            board::render(&question, perspective),
            instructions(&question)
        );
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;

        let asked = Instant::now();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let answer = line.trim();
        if answer.is_empty() || answer == "q" {
            break;
        }
        let response_ms = u32::try_from(asked.elapsed().as_millis()).unwrap_or(u32::MAX);

        let target = question.target.to_string();
        let checked = drills
            .check_answer(
                args.user_id,
                CheckAnswerRequest {
                    session_id: session_id.to_string(),
                    target: target.clone(),
                    answer: answer.to_owned(),
                    response_ms,
                    drill_type: drill_type.as_str().to_owned(),
                    piece_type: args.start.piece_type.clone(),
                    fen: Some(question.fen.clone()),
                },
            )
            .await?;
        let verdict = if checked.correct {
            format!("Correct! ({response_ms} ms)\n")
        } else {
            format!("Incorrect, it was {target}. ({response_ms} ms)\n")
        };
        stdout.write_all(verdict.as_bytes()).await?;
        question = checked.next_question;
    }

    let summary = drills.end_session(session_id).await?;
    info!(session_id = %session_id, "drill finished");

    let text = if args.json {
        format!("{}\n", serde_json::to_string_pretty(&summary)?)
    } else {
        format!(
            "\nAnswered {} / correct {} / average {} ms / best streak {}\n",
            summary.total_attempts, summary.correct, summary.avg_response_ms, summary.streak_best
        )
    };
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn run_stats(stats: &StatsService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let overall = stats.overall_stats(args.user_id).await?;
    let heatmap = stats.heatmap(args.user_id).await?;

    if args.json {
        let body = serde_json::json!({
            "overall": overall,
            "heatmap": heatmap,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!(
        "Sessions {} / attempts {} / accuracy {:.1}% / average {} ms / best streak {}",
        overall.total_sessions,
        overall.total_attempts,
        overall.overall_accuracy,
        overall.avg_response_ms,
        overall.best_streak
    );
    for drill in &overall.drill_stats {
        println!(
            "  {:<15} {:>5} attempts {:>6.1}% {:>6} ms  streak {} (best {})",
            drill.drill_type.as_str(),
            drill.total_attempts,
            drill.accuracy,
            drill.avg_response_ms,
            drill.current_streak,
            drill.best_streak
        );
    }
    println!();
    print!("{}", board::render_heatmap(&heatmap));
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means a drill session.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Drill,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with('-') => Command::Drill,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with('-') {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing(parsed.verbose)?;
    debug!(db_url = %parsed.db_url, user_id = %parsed.user_id, ?cmd, "starting");

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), parsed.seed).await?;

    match cmd {
        Command::Drill => {
            let perspective = services::api::perspective_from_wire(&parsed.start.perspective)?;
            run_drill(&app.drills(), &parsed, perspective).await
        }
        Command::Stats => run_stats(&app.stats(), &parsed).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
