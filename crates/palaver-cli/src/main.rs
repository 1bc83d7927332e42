use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use palaver_application::ChatService;
use palaver_infrastructure::{ConfigService, FileKeyValueStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::chat::KindArg;

#[derive(Parser)]
#[command(name = "palaver")]
#[command(about = "Palaver - pairwise conversation store with legacy schema migration", long_about = None)]
struct Cli {
    /// Directory of the key-value store (overrides the configured one)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file to read instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate an owner's legacy conversation data and print the report
    Migrate {
        #[arg(long)]
        owner: String,
    },
    /// Enter the chat view and list conversations
    List {
        /// Owner to list for; the signed-in user when omitted
        #[arg(long)]
        owner: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one conversation
    Show {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        partner: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Deliver a message to both participants
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value_t = KindArg::Text)]
        kind: KindArg,
        /// Text body, or a data URI for media
        content: String,
    },
    /// Record the signed-in user
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
}

fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = config_service.get_config();

    let level = match cli.verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    init_logging(level)?;

    let store_dir = config_service.store_dir(cli.data_dir.as_deref())?;
    tracing::debug!(dir = %store_dir.display(), "Opening store");
    let kv = FileKeyValueStore::open(&store_dir)
        .with_context(|| format!("Failed to open store at {}", store_dir.display()))?;
    let service = ChatService::from_config(Arc::new(kv), &config);

    match cli.command {
        Commands::Migrate { owner } => commands::migrate::run(&service, &owner)?,
        Commands::List { owner, json } => commands::chat::list(&service, owner.as_deref(), json)?,
        Commands::Show {
            owner,
            partner,
            json,
        } => commands::chat::show(&service, &owner, &partner, json)?,
        Commands::Send {
            from,
            to,
            kind,
            content,
        } => commands::chat::send(&service, &from, &to, kind, &content)?,
        Commands::Login {
            email,
            name,
            avatar,
        } => commands::login::run(&service, &email, name.as_deref(), avatar.as_deref())?,
    }

    Ok(())
}
