// immo-score/src/logging.rs
//
// Console logs always; a plain-text daily file under the configured log dir unless disabled.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `logs/immo_score_YYYYMMDD.log` for today.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("immo_score_{}.log", Local::now().format("%Y%m%d")))
}

/// RUST_LOG wins; otherwise `info`, or `debug` with `--debug`.
fn filter(debug: bool) -> EnvFilter {
    let default = if debug { "immo_score=debug,immo_score_core=debug,info" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init(debug: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new().create(true).append(true).open(log_file_path(dir))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter(debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(file_layer)
        .try_init()?;
    Ok(())
}
