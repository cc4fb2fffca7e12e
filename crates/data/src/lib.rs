//! Local data for the earnings statistics tools.
//!
//! This crate provides:
//! - Historical earnings CSV loading
//! - The earnings-history downloader
//! - A persistent HTTP response cache
//! - Trade journal storage and grouping

pub mod cache;
pub mod csv_storage;
pub mod downloader;
pub mod error;
pub mod history;
pub mod journal;

pub use cache::{CacheError, ResponseCache};
pub use csv_storage::CsvStorage;
pub use downloader::{Credentials, DownloadError, Downloader, DownloaderConfig};
pub use error::DataError;
pub use history::{looks_like_markup, HistoricalEarningsRecord, HistoricalSeries};
pub use journal::{group_trades, JournalTrade, OptionOrderRecord, OptionStrategy};

use earnings_core::Ticker;
use std::path::{Path, PathBuf};

/// File name of a ticker's downloaded history.
pub const EARNINGS_FILE: &str = "earnings.csv";

/// `{data_dir}/{TICKER}/earnings.csv`
#[must_use]
pub fn earnings_path(data_dir: &Path, ticker: &Ticker) -> PathBuf {
    data_dir.join(ticker.as_str()).join(EARNINGS_FILE)
}
