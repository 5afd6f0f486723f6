use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use chat_toxicity::config::AppConfig;
use chat_toxicity::db::Database;
use chat_toxicity::logging::init_logging;
use chat_toxicity::metrics::MetricsCollector;
use chat_toxicity::models::OutputFormat;
use chat_toxicity::repository::SqliteRepository;
use chat_toxicity::service::ImportService;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a conversation
    Create {
        /// Conversation title
        #[arg(short, long)]
        title: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List conversations, newest first
    List,
    /// Import raw chat text into a conversation
    Import {
        /// Conversation id
        #[arg(short = 'C', long)]
        conversation: i64,

        /// File holding the chat text; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show a page of stored messages
    Messages {
        /// Conversation id
        #[arg(short = 'C', long)]
        conversation: i64,

        /// Page size
        #[arg(short, long)]
        limit: Option<i64>,

        /// Messages to skip
        #[arg(short, long)]
        offset: Option<i64>,
    },
    /// Show the stored summary of a conversation
    Summary {
        /// Conversation id
        #[arg(short = 'C', long)]
        conversation: i64,
    },
    /// Recompute the summary of a conversation from its messages
    Recompute {
        /// Conversation id
        #[arg(short = 'C', long)]
        conversation: i64,
    },
    /// Export messages and summary to a file
    Export {
        /// Conversation id
        #[arg(short = 'C', long)]
        conversation: i64,

        /// Output format (csv or json)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging; the guard flushes file logs on exit
    let _log_guard = init_logging(&config.logging)?;
    if let Err(e) = MetricsCollector::init() {
        warn!(error = %e, "Metrics recorder not installed");
    }

    info!("Starting chat-toxicity");

    if matches!(cli.command, Commands::ShowConfig) {
        return show_config(&config);
    }

    let database = Database::from_config(&config.database).context("Failed to open database")?;
    let repository = Arc::new(SqliteRepository::new(database));
    let service = ImportService::from_config(&config, repository)?;

    match cli.command {
        Commands::Create { title, description } => {
            let conversation = service.create_conversation(&title, description.as_deref()).await?;
            print_json(&conversation)?;
        },
        Commands::List => print_json(&service.list_conversations().await?)?,
        Commands::Import { conversation, file } => {
            let raw = read_input(file.as_ref())?;
            let outcome = service.import(conversation, &raw).await?;
            print_json(&outcome)?;
        },
        Commands::Messages {
            conversation,
            limit,
            offset,
        } => print_json(&service.list_messages(conversation, limit, offset).await?)?,
        Commands::Summary { conversation } => print_json(&service.get_summary(conversation).await?)?,
        Commands::Recompute { conversation } => print_json(&service.recompute_summary(conversation).await?)?,
        Commands::Export {
            conversation,
            format,
            output_dir,
        } => {
            let format: OutputFormat = format.parse()?;
            let path = service.export(conversation, format, &output_dir).await?;
            print_json(&serde_json::json!({ "path": path }))?;
        },
        Commands::ShowConfig => {},
    }

    Ok(())
}

/// Read chat text from a file, or stdin when no file is given
fn read_input(file: Option<&PathBuf>) -> Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()));
    }

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read chat text from stdin")?;
    Ok(raw)
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn show_config(config: &AppConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.analysis.api_key.is_some() {
        shown.analysis.api_key = Some("***".to_string());
    }
    print!("{}", serde_yaml::to_string(&shown)?);
    Ok(())
}
