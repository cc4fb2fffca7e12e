//! Ticker validation pipeline.
//!
//! Each validator answers one question about a ticker and fails with a
//! typed [`ValidationError`]. The pipeline runs them in [`ValidatorKind::ALL`]
//! order and stops at the first failure, so a ticker that does not exist
//! never reaches the options or earnings endpoints.

use crate::error::ValidationError;
use async_trait::async_trait;
use earnings_core::{MarketDataProvider, Ticker};
use earnings_data::looks_like_markup;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub type ValidationResult = std::result::Result<(), ValidationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Ticker,
    Option,
    Data,
    Earnings,
}

impl ValidatorKind {
    /// Pipeline order. The data file is checked after the ticker and
    /// option lookups so it has been downloaded by then.
    pub const ALL: [ValidatorKind; 4] = [Self::Ticker, Self::Option, Self::Data, Self::Earnings];

    /// The tail of [`Self::ALL`] that runs once the history file is on
    /// disk, for callers that check the ticker before downloading.
    pub const AFTER_DOWNLOAD: [ValidatorKind; 3] = [Self::Option, Self::Data, Self::Earnings];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Option => "option",
            Self::Data => "data",
            Self::Earnings => "earnings",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    fn kind(&self) -> ValidatorKind;

    async fn validate(&self) -> ValidationResult;
}

// =============================================================================
// Validators
// =============================================================================

/// Fails with [`ValidationError::InvalidTicker`] if the provider does not
/// know the symbol.
pub struct TickerValidator {
    ticker: Ticker,
    provider: Arc<dyn MarketDataProvider>,
}

impl TickerValidator {
    pub fn new(ticker: Ticker, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { ticker, provider }
    }
}

#[async_trait]
impl Validator for TickerValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Ticker
    }

    async fn validate(&self) -> ValidationResult {
        if self.provider.exists(&self.ticker).await? {
            Ok(())
        } else {
            Err(ValidationError::InvalidTicker(self.ticker.clone()))
        }
    }
}

pub struct OptionsValidator {
    ticker: Ticker,
    provider: Arc<dyn MarketDataProvider>,
}

impl OptionsValidator {
    pub fn new(ticker: Ticker, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { ticker, provider }
    }
}

#[async_trait]
impl Validator for OptionsValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Option
    }

    async fn validate(&self) -> ValidationResult {
        if self.provider.supports_options(&self.ticker).await? {
            Ok(())
        } else {
            Err(ValidationError::InvalidOption(self.ticker.clone()))
        }
    }
}

pub struct EarningsValidator {
    ticker: Ticker,
    provider: Arc<dyn MarketDataProvider>,
}

impl EarningsValidator {
    pub fn new(ticker: Ticker, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { ticker, provider }
    }
}

#[async_trait]
impl Validator for EarningsValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Earnings
    }

    async fn validate(&self) -> ValidationResult {
        if self.provider.has_future_earnings_dates(&self.ticker).await? {
            Ok(())
        } else {
            Err(ValidationError::InvalidEarnings(self.ticker.clone()))
        }
    }
}

/// Rejects a history file that is missing or holds an HTML page, which is
/// what the download site serves when a login or lookup fails.
#[derive(Debug)]
pub struct DataValidator {
    path: PathBuf,
}

impl DataValidator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Validator for DataValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Data
    }

    async fn validate(&self) -> ValidationResult {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValidationError::MissingData {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if looks_like_markup(&String::from_utf8_lossy(&bytes)) {
            return Err(ValidationError::InvalidData {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds validators for one ticker and its history file.
pub struct ValidatorFactory {
    ticker: Ticker,
    path: PathBuf,
    provider: Arc<dyn MarketDataProvider>,
}

impl ValidatorFactory {
    pub fn new(ticker: Ticker, path: impl Into<PathBuf>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            ticker,
            path: path.into(),
            provider,
        }
    }

    #[must_use]
    pub fn create(&self, kind: ValidatorKind) -> Box<dyn Validator> {
        match kind {
            ValidatorKind::Ticker => Box::new(TickerValidator::new(
                self.ticker.clone(),
                Arc::clone(&self.provider),
            )),
            ValidatorKind::Option => Box::new(OptionsValidator::new(
                self.ticker.clone(),
                Arc::clone(&self.provider),
            )),
            ValidatorKind::Data => Box::new(DataValidator::new(self.path.clone())),
            ValidatorKind::Earnings => Box::new(EarningsValidator::new(
                self.ticker.clone(),
                Arc::clone(&self.provider),
            )),
        }
    }

    /// Runs the given validators in order, stopping at the first failure.
    ///
    /// # Errors
    /// The first validator's failure.
    pub async fn validate(&self, kinds: &[ValidatorKind]) -> ValidationResult {
        for kind in kinds {
            self.create(*kind).validate().await?;
            debug!(ticker = %self.ticker, validator = %kind, "Validation passed");
        }
        Ok(())
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    /// The first validator's failure.
    pub async fn validate_all(&self) -> ValidationResult {
        self.validate(&ValidatorKind::ALL).await
    }
}
