use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biteburst::api::{self, SecurityConfig};
use biteburst::client::BiteBurstClient;
use biteburst::config::AppConfig;
use biteburst::models::LessonState;

const DEFAULT_PORT: u16 = 3000;

#[derive(Parser)]
#[command(name = "biteburst")]
#[command(about = "Lesson progression and habit logging for BiteBurst")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the BiteBurst API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQLite database file (overrides BITEBURST_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Check whether a server is reachable
    Status,
    /// Print a child's lesson path
    Path {
        /// Child id as supplied by the identity provider
        child_id: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "biteburst=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, db: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if db.is_some() {
        config.db_path = db;
    }

    let state = config.build_state()?;
    let security = SecurityConfig::from_env();
    if security.api_key.is_none() {
        tracing::warn!("BITEBURST_API_KEY is not set, API is unauthenticated");
    }

    let app = api::create_router_with_config(state, security);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("BiteBurst server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await?,
        None => serve(DEFAULT_PORT, None).await?,
        Some(Commands::Status) => {
            let client = BiteBurstClient::from_env();
            match client.health().await {
                Ok(true) => println!("BiteBurst server at {} is up", client.base_url()),
                Ok(false) => println!("BiteBurst server at {} reports unhealthy", client.base_url()),
                Err(e) => {
                    println!("BiteBurst server at {} is unreachable: {}", client.base_url(), e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Path { child_id }) => {
            let client = BiteBurstClient::from_env();
            let lessons = client.lessons().await?;
            let path = client.path(&child_id).await?;

            println!(
                "{}: {} XP, {} day streak, {}/{} lessons",
                path.child_id,
                path.total_xp,
                path.current_streak_days,
                path.completed_count,
                path.total_lessons
            );
            for node in &path.lessons {
                let title = lessons
                    .iter()
                    .find(|l| l.id == node.lesson_id)
                    .map(|l| l.title.as_str())
                    .unwrap_or(node.lesson_id.as_str());
                let marker = match node.state {
                    LessonState::Completed => "[x]",
                    LessonState::Current => "[>]",
                    LessonState::Unlocked => "[ ]",
                    LessonState::Locked => "[-]",
                };
                println!("  {} {} ({})", marker, title, node.state.as_str());
            }
        }
    }

    Ok(())
}
