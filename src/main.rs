use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use llamadesk::config::Config;
use llamadesk::console;

/// Console assistant driving a local llama.cpp engine over its standard
/// streams, with document, OCR, retrieval, and speech collaborators.
#[derive(Parser)]
#[command(name = "llamadesk", version, about)]
struct Cli {
    /// Alternate config file (default: ~/.config/llamadesk/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine model path, overriding the config.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Engine executable, overriding the config.
    #[arg(long)]
    engine: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout belongs to the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = cli.model {
        config.engine.model = model;
    }
    if let Some(engine) = cli.engine {
        config.engine.executable = engine;
    }
    config.validate()?;

    console::run(config)
}
