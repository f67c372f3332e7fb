// immo-score/src/main.rs

mod cli;
mod commands;
mod logging;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Commands};
use immo_score_core::infrastructure::config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Settings: defaults < immo_score.yaml < env < CLI flags
    let mut settings = load_settings(&cli.config_dir)
        .with_context(|| format!("Failed to load settings from {:?}", cli.config_dir))?;
    if let Some(db_path) = cli.db_path {
        settings.database_path = db_path;
    }

    // 2. Logging (RUST_LOG=debug immo-score generate ... pour voir les détails)
    let log_dir = (!cli.no_log_file).then_some(settings.log_dir.as_path());
    logging::init(cli.debug, log_dir)?;
    tracing::debug!(?settings, "Settings resolved");

    match cli.command {
        Commands::Generate {
            commune,
            province,
            periods,
        } => commands::generate::execute(settings, commune, province, periods).await,
        Commands::Stats { province } => commands::stats::execute(&settings, province),
        Commands::Merge { province } => commands::merge::execute(&settings, province),
    }
}
