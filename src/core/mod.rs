//! Core pipeline abstractions

pub mod calendar;
pub mod currency;
pub mod error;
pub mod log;
pub mod rates;
pub mod warehouse;

// Re-export main types for cleaner imports
pub use calendar::DateDimensionRow;
pub use currency::CURRENCIES;
pub use error::PipelineError;
pub use rates::{RateHistory, RateHistoryProvider};
pub use warehouse::Warehouse;
