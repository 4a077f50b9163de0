#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use groupwarden::client::{FeedClient, GroupClient};
use groupwarden::config::Config;
use groupwarden::retry::RetryPolicy;
use groupwarden::safety::{SafetyPolicy, SafetyStateStore};
use groupwarden::session::SessionOrchestrator;

#[derive(Parser)]
#[command(
    name = "groupwarden",
    version,
    about = "Rate-limited group-feed comment automation"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one commenting session against the configured group.
    Run {
        /// Override GROUPWARDEN_MAX_POSTS for this run.
        #[arg(long)]
        max_posts: Option<usize>,
        /// Force headless mode regardless of GROUPWARDEN_HEADLESS.
        #[arg(long)]
        headless: bool,
    },
    /// Print the current safety counters and configured limits.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run {
        max_posts: None,
        headless: false,
    }) {
        Command::Run {
            max_posts,
            headless,
        } => run(max_posts, headless).await,
        Command::Status => status(),
    }
}

async fn run(max_posts: Option<usize>, headless: bool) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(max_posts) = max_posts {
        config.max_posts = max_posts;
    }
    if headless {
        config.headless = true;
    }
    config.validate()?;

    let store = SafetyStateStore::new(config.state_file());
    let policy = SafetyPolicy::load(config.limits, store, Utc::now());
    let client = FeedClient::connect(&config).await?;
    let mut orchestrator = SessionOrchestrator::new(config, policy, RetryPolicy::default());

    // An interrupt must still leave the counters persisted, so the session
    // races against ctrl-c and state is flushed on that path too.
    let outcome = tokio::select! {
        result = orchestrator.run(&client) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(result) => {
            close_client(&client).await;
            let report = result?;
            println!("{report}");
        }
        None => {
            tracing::info!("interrupted - persisting safety state before exit");
            orchestrator.persist();
            close_client(&client).await;
        }
    }
    Ok(())
}

fn status() -> Result<()> {
    let config = Config::from_env()?;
    let store = SafetyStateStore::new(config.state_file());
    let mut policy = SafetyPolicy::load(config.limits, store, Utc::now());
    println!("{}", policy.status(Utc::now()));
    Ok(())
}

async fn close_client(client: &FeedClient) {
    if let Err(e) = client.close().await {
        tracing::warn!("could not close browser session: {e}");
    }
}
