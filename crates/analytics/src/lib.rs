//! Earnings statistics and ticker validation.
//!
//! This crate provides:
//! - Statistic strategies over a ticker's earnings history, built by
//!   [`StatisticFactory`]
//! - The ticker validation pipeline, built by [`ValidatorFactory`]
//! - Backend selection via [`MarketDataBackend`] and [`ClientFactory`]
//! - Single-ticker and multi-ticker report tables

pub mod backend;
pub mod error;
pub mod report;
pub mod statistics;
pub mod validators;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ClientFactory, MarketClient, MarketDataBackend};
pub use error::{ReportError, ValidationError};
pub use report::{SummaryRow, SummaryTable, TickerReport};
pub use statistics::{
    SharedPrediction, StatValue, Statistic, StatisticFactory, StatisticKind, StatisticSeries,
};
pub use validators::{
    DataValidator, EarningsValidator, OptionsValidator, TickerValidator, ValidationResult,
    Validator, ValidatorFactory, ValidatorKind,
};
