use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    ConfigCommand, ExportCommand, FingerprintCommand, ImportCommand, QueryCommand,
    ResolveCommand, SetCommand, UpdateCommand,
};
use qzemoji::{Config, QzEmoji};

#[derive(Parser)]
#[command(name = "qzemoji")]
#[command(version)]
#[command(about = "Translate Qzone emoji ids to text", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Skip the automatic snapshot update for this run
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up emoji text by id, URL or tag
    Query(QueryCommand),

    /// Set your own text for an emoji
    Set(SetCommand),

    /// Export all known emoji as YAML
    Export(ExportCommand),

    /// Synchronize with the published snapshot
    Update(UpdateCommand),

    /// Replace the base table from a snapshot file
    Import(ImportCommand),

    /// Extract an emoji id from a URL or tag
    Resolve(ResolveCommand),

    /// Show table fingerprints
    Fingerprint(FingerprintCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qzemoji=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config)?;
    if cli.offline {
        config.auto_update.value = false;
    }

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    // Commands that never touch the store
    match &command {
        Commands::Resolve(cmd) => return cmd.run(),
        Commands::Config(cmd) => return cmd.run(&config),
        _ => {}
    }

    let emoji = QzEmoji::new(config);
    match command {
        Commands::Query(cmd) => cmd.run(&emoji).await?,
        Commands::Set(cmd) => cmd.run(&emoji).await?,
        Commands::Export(cmd) => cmd.run(&emoji).await?,
        Commands::Update(cmd) => cmd.run(&emoji).await?,
        Commands::Import(cmd) => cmd.run(&emoji).await?,
        Commands::Fingerprint(cmd) => cmd.run(&emoji).await?,
        Commands::Resolve(_) | Commands::Config(_) => {}
    }

    Ok(())
}
