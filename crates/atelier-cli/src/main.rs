use anyhow::Result;
use atelier_application::Studio;
use atelier_core::config::AtelierConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Atelier - turn a project idea into architecture, UI and logic drafts", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ~/.config/atelier/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one generation and write the export file
    Generate {
        /// Project description
        prompt: String,

        /// Number of extra agents to add after the initial roster
        #[arg(long, default_value_t = 0)]
        agents: usize,

        /// Directory the export file is written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Start the interactive studio
    Repl,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("atelier=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AtelierConfig> {
    let config = match path {
        Some(path) => AtelierConfig::load_from(&path)?
            .with_overrides(|key| std::env::var(key).ok()),
        None => AtelierConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config)?;
    tracing::debug!(model = %config.model, "Configuration loaded");
    let studio = Studio::from_config(&config);

    match cli.command {
        Commands::Generate {
            prompt,
            agents,
            out,
        } => commands::generate::run(studio, &prompt, agents, &out).await?,
        Commands::Repl => commands::repl::run(studio).await?,
    }

    Ok(())
}
