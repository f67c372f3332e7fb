// immo-score-core/src/ports/mod.rs

pub mod warehouse;

pub use warehouse::{Row, SqlParam, Warehouse};
