pub mod error;
pub mod format;
pub mod metadata;
pub mod outcome;
pub mod period;
pub mod settings;
pub mod trend;
pub mod value;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
pub use format::NumberFormatter;
pub use outcome::ExtractionOutcome;
pub use period::{Granularity, Period};
pub use trend::{MarketTrend, Trend, TrendClassifier};
