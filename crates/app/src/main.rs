use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use quiz_core::Clock;
use quiz_core::model::{ProviderIdentity, QuestionOption, QuizId, QuizStatus, Session, SessionId};
use services::{AppServices, TwitchProvider};
use storage::repository::{
    NewHostRecord, NewPlayerRecord, NewQuestionRecord, NewQuizRecord, Storage, StorageError,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
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
    eprintln!("  cargo run -p app -- status [--db <sqlite_url>] [--quiz-id <id>]");
    eprintln!("  cargo run -p app -- seed   [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- demo   [--db <sqlite_url>] [--quiz-id <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --quiz-id 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_ID");
    eprintln!("  QUIZ_TWITCH_CLIENT_ID, QUIZ_TWITCH_CLIENT_SECRET, QUIZ_TWITCH_REDIRECT_URL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Seed,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "seed" => Some(Self::Seed),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    quiz_id: QuizId,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| QuizId::new(1), QuizId::new);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = QuizId::new(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, quiz_id })
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let clock = Clock::default_clock();

    match cmd {
        Command::Status => status(&storage, parsed.quiz_id).await,
        Command::Seed => seed(&storage, clock).await,
        Command::Demo => demo(&storage, clock, parsed.quiz_id).await,
    }
}

/// Plays one scripted round against the full service stack and prints the
/// final scoreboard. The browser handshake is skipped; a synthetic session
/// stands in for a logged-in quizmaster.
async fn demo(
    storage: &Storage,
    clock: Clock,
    quiz_id: QuizId,
) -> Result<(), Box<dyn std::error::Error>> {
    let services = AppServices::from_storage(storage, clock, Arc::new(TwitchProvider::from_env()));
    let rounds = services.rounds();

    let now = clock.now();
    let session = Session::new(
        SessionId::generate(),
        ProviderIdentity {
            twitch_id: "demo".into(),
            login: "demo".into(),
            email: None,
        },
        "demo-token",
        now,
        now + Duration::hours(1),
    )?;

    let questions = storage.questions.list_questions(quiz_id).await?;
    let players = storage.players.list_players(quiz_id).await?;

    let host = rounds.host_round(&session, quiz_id).await?;
    rounds.start(&host).await?;

    for (index, question) in questions.iter().enumerate() {
        for (position, player) in players.iter().enumerate() {
            // The first player always answers correctly; the rest rotate
            // through the options.
            let option = if position == 0 {
                question.correct_option()
            } else {
                (index + position) % question.option_count()
            };
            rounds.submit_answer(&host, player.id(), option).await?;
        }
        rounds.close_answers(&host).await?;
        rounds.advance(&host).await?;
    }

    let snapshot = host.snapshot();
    println!("round {} finished:", snapshot.round_id);
    for row in &snapshot.scoreboard {
        println!("  #{} {}: {} pts", row.rank, row.nickname, row.score);
    }
    Ok(())
}

async fn status(storage: &Storage, quiz_id: QuizId) -> Result<(), Box<dyn std::error::Error>> {
    let Some(quiz) = storage.quizzes.get_quiz(quiz_id).await? else {
        println!("quiz {quiz_id}: not found (run `seed` first?)");
        return Ok(());
    };

    let questions = storage.questions.list_questions(quiz_id).await?;
    let players = storage.players.list_players(quiz_id).await?;
    let summaries = storage.summaries.list_summaries_for_quiz(quiz_id, 5).await?;

    println!("quiz {quiz_id}: {} [{}]", quiz.title(), quiz.status().as_str());
    if let Some(description) = quiz.description() {
        println!("  {description}");
    }
    println!("  questions: {}", questions.len());
    println!("  players:   {}", players.len());
    println!("  recent rounds:");
    if summaries.is_empty() {
        println!("    (none)");
    }
    for summary in summaries {
        println!(
            "    {}: {} answers ({} correct) over {} questions",
            summary.completed_at(),
            summary.answers_submitted(),
            summary.correct(),
            summary.questions_asked(),
        );
    }
    Ok(())
}

async fn seed(storage: &Storage, clock: Clock) -> Result<(), Box<dyn std::error::Error>> {
    let now = clock.now();

    let host_id = match storage.hosts.get_host_by_twitch_id("seed-host").await? {
        Some(host) => host.id(),
        None => {
            storage
                .hosts
                .insert_host(NewHostRecord {
                    username: "quizmaster".into(),
                    twitch_id: "seed-host".into(),
                    email: None,
                    created_at: now,
                })
                .await?
        }
    };

    let quiz_id = storage
        .quizzes
        .insert_quiz(NewQuizRecord {
            host_id,
            title: "Sample Trivia".into(),
            description: Some("seeded demo quiz".into()),
            status: QuizStatus::Ready,
            created_at: now,
        })
        .await?;

    let questions: [(&str, Vec<QuestionOption>); 3] = [
        (
            "Which planet is known as the Red Planet?",
            vec![
                QuestionOption::new("Mars", true),
                QuestionOption::new("Venus", false),
                QuestionOption::new("Jupiter", false),
            ],
        ),
        (
            "What is the largest ocean on Earth?",
            vec![
                QuestionOption::new("Atlantic", false),
                QuestionOption::new("Pacific", true),
                QuestionOption::new("Indian", false),
            ],
        ),
        (
            "How many sides does a hexagon have?",
            vec![
                QuestionOption::new("five", false),
                QuestionOption::new("seven", false),
                QuestionOption::new("six", true),
            ],
        ),
    ];
    for (index, (text, options)) in questions.into_iter().enumerate() {
        storage
            .questions
            .insert_question(NewQuestionRecord {
                quiz_id,
                text: (*text).to_owned(),
                image_url: None,
                time_limit_secs: 30,
                order_index: u32::try_from(index).unwrap_or(u32::MAX),
                options,
                created_at: now,
            })
            .await?;
    }

    for nickname in ["Alice", "Bob"] {
        match storage
            .players
            .insert_player(NewPlayerRecord {
                quiz_id,
                nickname: nickname.into(),
            })
            .await
        {
            Ok(_) | Err(StorageError::Conflict) => {}
            Err(e) => return Err(e.into()),
        }
    }

    println!("seeded quiz {quiz_id} (3 questions, 2 players)");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
