// immo-score/src/commands/mod.rs

pub mod generate;
pub mod merge;
pub mod stats;
