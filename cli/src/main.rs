use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use edict_cli::ConsoleCaller;
use edict_core::Caller;
use edict_core::ConfigLoader;
use edict_core::Received;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Interactive console for the demo command set.
///
/// Each line is either a command or, while a choice is pending, the answer
/// to it. Prefix a line with `?` to list completions instead of running it.
#[derive(Debug, Parser)]
#[command(name = "edict", version)]
struct Cli {
    /// TOML config file; the standard locations are searched when omitted
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the configured match threshold (0.0-1.0)
    #[arg(long)]
    threshold: Option<f64>,

    /// Take the first candidate instead of asking
    #[arg(long)]
    pick_first: bool,

    /// Name shown for the console user
    #[arg(long, default_value = "console")]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new().with_file(path).load()?,
        None => ConfigLoader::load_default()?,
    };
    if let Some(threshold) = cli.threshold {
        config.match_threshold = threshold;
    }
    if cli.pick_first {
        config.always_pick_first_option = true;
    }
    config.validate()?;

    let dispatcher = edict_cli::demo_dispatcher(config)?;
    let console: Arc<dyn Caller> = Arc::new(ConsoleCaller::new(cli.name));
    tracing::info!("edict v{} ready", env!("CARGO_PKG_VERSION"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(partial) = line.strip_prefix('?') {
            let suggestions = dispatcher.suggest(partial.trim_start(), console.as_ref())?;
            console.send(edict_core::Message::text(suggestions.join("  ")));
            continue;
        }

        match dispatcher.receive(Arc::clone(&console), &line) {
            Received::Reply => {}
            Received::Dispatched(handle) => {
                // Keep reading input: the command may be waiting on a reply.
                tokio::spawn(async move {
                    match handle.await {
                        Ok(outcome) => tracing::debug!(?outcome, "dispatch finished"),
                        Err(err) => tracing::warn!("dispatch task failed: {err}"),
                    }
                });
            }
        }
    }

    dispatcher.shutdown();
    Ok(())
}
