// immo-score/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "immo-score")]
#[command(about = "Municipality statistical reports for the Belgian real-estate market", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Verbose logs (debug level unless RUST_LOG says otherwise)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Do not write logs/immo_score_YYYYMMDD.log
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Directory holding immo_score.yaml
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    /// DuckDB warehouse file (overrides the settings file)
    #[arg(long, global = true, env = "IMMO_SCORE_DATABASE")]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generates reports for one commune or a whole province
    Generate {
        /// Commune identifier (id_geography)
        #[arg(long, short)]
        commune: Option<i64>,

        /// Province to generate (ex: "Namur")
        #[arg(long, short)]
        province: Option<String>,

        #[command(flatten)]
        periods: PeriodOverrides,
    },

    /// Compares communes of a province (min/max of key metrics)
    Stats {
        /// Province folder to analyse; all provinces when omitted
        #[arg(long, short)]
        province: Option<String>,
    },

    /// Merges every report of a province into one file
    Merge {
        /// Province folder to merge (ex: "namur")
        #[arg(long, short)]
        province: String,
    },
}

/// Per-domain period overrides; unset flags keep the configured period.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct PeriodOverrides {
    /// Real-estate period (ex: 2024-Q4)
    #[arg(long)]
    pub real_estate_period: Option<String>,

    /// Economic period (ex: 2023)
    #[arg(long)]
    pub economic_period: Option<String>,

    /// Demographic period (ex: 2023)
    #[arg(long)]
    pub demographic_period: Option<String>,

    /// Tax period (ex: 2022)
    #[arg(long)]
    pub tax_period: Option<String>,

    /// Construction period (ex: 2024-Q1)
    #[arg(long)]
    pub construction_period: Option<String>,
}
