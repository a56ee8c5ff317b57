mod app;
mod prompt;

use anyhow::{anyhow, Context, Result};
use std::{
    env,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use wordcards_core::config::{self, AppConfig};

const USAGE: &str = "usage: wordcards [DECK.csv]";

#[tokio::main]
async fn main() -> Result<()> {
    let arg = env::args_os().nth(1).map(PathBuf::from);
    if matches!(arg.as_deref().and_then(Path::to_str), Some("-h" | "--help")) {
        println!("{USAGE}");
        return Ok(());
    }

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir())?;

    let deck_path = arg.or_else(|| config.deck_path.clone()).ok_or_else(|| {
        anyhow!(
            "no deck given\n{USAGE}\nor set deck_path in {}",
            config::config_path().display()
        )
    })?;
    info!(path = %deck_path.display(), "Starting wordcards");

    let mut app = app::WordcardsApp::new(config, deck_path);
    app.run().await
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("wordcards.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
