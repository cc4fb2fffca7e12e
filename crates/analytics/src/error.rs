use earnings_core::{ProviderError, Ticker};
use earnings_data::DataError;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a ticker is kept out of a report.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0} is an invalid ticker")]
    InvalidTicker(Ticker),

    #[error("{0} does not support options")]
    InvalidOption(Ticker),

    #[error("{0} has no upcoming earnings dates")]
    InvalidEarnings(Ticker),

    #[error("{} contains markup instead of earnings data", path.display())]
    InvalidData { path: PathBuf },

    #[error("{} does not exist", path.display())]
    MissingData { path: PathBuf },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from building a report for one ticker.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Data(#[from] DataError),
}
