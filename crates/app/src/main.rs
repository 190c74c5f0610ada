mod quiz;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quiz_core::model::{
    DEFAULT_DURATION_MINUTES, DEFAULT_QUESTION_COUNT, Difficulty, Identity, OwnerId,
    SessionConfigDraft, SessionMode, SourceMode, Topic, topic,
};
use services::{
    AnonymousPolicy, AppServices, Clock, DEFAULT_HISTORY_LIMIT, DEFAULT_SEED_COUNT,
    notice_channel,
};
use tracing::debug;

const DEFAULT_LOG_FILTER: &str = "prep_portal=info,services=info,storage=info";

#[derive(Parser, Debug)]
#[command(name = "prep-portal", version, about = "Practice quizzes for competitive-event prep")]
struct Cli {
    /// SQLite database holding the shared pool, history and feedback.
    #[arg(long, global = true, env = "QUIZ_DB_URL", default_value = "sqlite://portal.sqlite3")]
    db: String,

    /// Signed-in user id. Without it the session is anonymous.
    #[arg(long, global = true, env = "QUIZ_USER_ID")]
    user: Option<String>,

    /// Store anonymous results in the shared history instead of this run only.
    #[arg(long, global = true)]
    anonymous_remote: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play an interactive quiz
    Quiz(QuizArgs),

    /// Generate questions into the shared pool
    Seed {
        topic: String,

        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        count: u32,

        #[arg(long, default_value = "hard")]
        difficulty: Difficulty,
    },

    /// Inspect the shared pool
    #[command(subcommand)]
    Pool(PoolCommands),

    /// Show recent results for the current user
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u32,
    },

    /// List topics, optionally filtered by a search term
    Topics { search: Option<String> },

    /// Send feedback about the portal
    Feedback { message: String },
}

#[derive(Subcommand, Debug)]
enum PoolCommands {
    /// Count pool questions for a topic
    Count { topic: String },
}

#[derive(Args, Debug)]
struct QuizArgs {
    topic: String,

    /// practice or timed
    #[arg(long, default_value = "practice")]
    mode: SessionMode,

    #[arg(long, default_value_t = DEFAULT_QUESTION_COUNT)]
    count: u32,

    /// Minutes on the clock for timed sessions.
    #[arg(long, default_value_t = DEFAULT_DURATION_MINUTES)]
    duration: u32,

    #[arg(long, default_value = "hard")]
    difficulty: Difficulty,

    /// ai or pool
    #[arg(long, default_value = "ai")]
    source: SourceMode,

    /// Write a plain-text report here when the session finishes.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl QuizArgs {
    fn draft(&self) -> SessionConfigDraft {
        SessionConfigDraft {
            topic: self.topic.clone(),
            mode: self.mode,
            question_count: self.count,
            duration_minutes: self.duration,
            difficulty: self.difficulty,
            source_mode: self.source,
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
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
        .ok_or_else(|| format!("invalid --db value: {db_url}"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(format!("invalid --db value: {db_url}").into());
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

fn identity(user: Option<&str>) -> Result<Identity, Box<dyn std::error::Error>> {
    Ok(match user {
        Some(raw) => Identity::signed_in(OwnerId::new(raw)?),
        None => Identity::Anonymous,
    })
}

fn print_topics(search: Option<&str>) {
    let topics = topic::search(search.unwrap_or_default());
    if topics.is_empty() {
        println!("no topics match");
    }
    for topic in topics {
        println!("{topic}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    // The catalogue is static; no database needed.
    if let Commands::Topics { search } = &cli.command {
        print_topics(search.as_deref());
        return Ok(());
    }

    let identity = identity(cli.user.as_deref())?;
    let policy = if cli.anonymous_remote {
        AnonymousPolicy::Remote
    } else {
        AnonymousPolicy::LocalOnly
    };

    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let (notices, notice_rx) = notice_channel();
    let app = AppServices::new_sqlite(&db_url, Clock::default(), policy, Some(notices)).await?;
    debug!(%db_url, user = identity.label(), ?policy, "services ready");

    match cli.command {
        Commands::Quiz(args) => {
            let driver = app.session_driver(identity);
            quiz::run(driver, args.draft(), notice_rx, args.report).await?;
        }
        Commands::Seed {
            topic,
            count,
            difficulty,
        } => {
            let topic = Topic::parse(&topic)?;
            let seeding = app.seeding();
            let before = seeding.pool_count(topic).await?;
            println!("Generating {count} {difficulty} questions for {topic}...");
            let report = seeding.seed(topic, count, difficulty).await?;
            println!(
                "Wrote {} questions for {} (pool: {before} -> {})",
                report.written,
                report.topic,
                seeding.pool_count(topic).await?
            );
        }
        Commands::Pool(PoolCommands::Count { topic }) => {
            let topic = Topic::parse(&topic)?;
            let count = app.seeding().pool_count(topic).await?;
            println!("{topic}: {count} questions");
        }
        Commands::History { limit } => {
            let rows = app.history().recent(&identity, limit).await?;
            if rows.is_empty() {
                println!("no results yet");
            }
            for row in rows {
                let record = row.record;
                println!(
                    "{}  {:<40} {:>3}%  {}/{}  {}",
                    record.created_at().format("%Y-%m-%d %H:%M"),
                    record.topic().as_str(),
                    record.score(),
                    record.correct_count(),
                    record.total_count(),
                    record.mode().label(),
                );
            }
        }
        Commands::Feedback { message } => {
            app.feedback().submit(&identity, &message).await?;
            println!("Thanks for the feedback.");
        }
        Commands::Topics { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
