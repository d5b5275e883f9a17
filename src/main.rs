use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memoria::catalogue::ImageIndex;
use memoria::channels::{Channel, ConsoleChannel, InboundMessage};
use memoria::commands::{CommandRouter, SearchCommand};
use memoria::userlog::TracingUserLog;
use memoria::{bot, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Image catalogue search bot.
#[derive(Parser, Debug)]
#[command(name = "memoria", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer commands typed on stdin until EOF or Ctrl-C
    Chat,

    /// Load a JSON array of images into the catalogue
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Run one search, e.g. `memoria search rowi --folder cmx_20`
    Search {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);

    let db_path = config.database_path();
    let index = ImageIndex::open(&db_path)?;
    tracing::debug!(path = %db_path.display(), "Catalogue opened");

    match cli.command {
        Commands::Chat => {
            let channel: Arc<dyn Channel> = Arc::new(ConsoleChannel::new());
            let router = Arc::new(build_router(&config, index, Arc::clone(&channel)));
            tokio::select! {
                result = bot::run(channel, router) => result?,
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, shutting down"),
            }
        }
        Commands::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let imported = index.import_json(&raw)?;
            tracing::info!(count = imported.len(), file = %file.display(), "Images imported");
            println!("Imported {} image(s) into {}", imported.len(), db_path.display());
        }
        Commands::Search { args } => {
            let channel: Arc<dyn Channel> = Arc::new(ConsoleChannel::new());
            let router = build_router(&config, index, channel);
            let content = format!("{} {}", router.search_invocation(), shell_words::join(&args));
            let message = InboundMessage::new("cli", "console", content);
            let outcome = router.dispatch(&message).await;
            tracing::debug!(?outcome, "One-shot search finished");
        }
    }

    Ok(())
}

fn build_router(config: &Config, index: ImageIndex, channel: Arc<dyn Channel>) -> CommandRouter {
    let search = SearchCommand::new(
        Arc::new(index),
        channel,
        Arc::new(TracingUserLog),
        config.search.clone(),
    );
    CommandRouter::new(config, search)
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr so stdout
/// carries only bot replies.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
