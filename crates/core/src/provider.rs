//! [`MarketDataProvider`] on top of any [`OptionsDataSource`].

use crate::dates::closest_on_or_after;
use crate::error::Result;
use crate::estimator::StraddleEstimator;
use crate::traits::{MarketDataProvider, OptionsDataSource};
use crate::types::Ticker;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

/// Answers ticker-level questions from a backend's raw lookups.
#[derive(Debug)]
pub struct MarketData<S> {
    source: S,
    estimator: StraddleEstimator,
}

impl<S: OptionsDataSource> MarketData<S> {
    pub fn new(source: S, estimator: StraddleEstimator) -> Self {
        Self { source, estimator }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: OptionsDataSource> MarketDataProvider for MarketData<S> {
    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        match self.source.exists(ticker).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_lookup_failure() => {
                debug!(ticker = %ticker, error = %e, "Ticker lookup failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn supports_options(&self, ticker: &Ticker) -> Result<bool> {
        match self.source.expiration_dates(ticker).await {
            Ok(expirations) => Ok(!expirations.is_empty()),
            Err(e) if e.is_lookup_failure() => {
                debug!(ticker = %ticker, error = %e, "No option chain");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn has_future_earnings_dates(&self, ticker: &Ticker) -> Result<bool> {
        Ok(self.next_earnings_date(ticker).await?.is_some())
    }

    async fn next_earnings_date(&self, ticker: &Ticker) -> Result<Option<NaiveDate>> {
        match self.source.earnings_dates(ticker).await {
            Ok(dates) => Ok(closest_on_or_after(self.source.today(), &dates)),
            Err(e) if e.is_lookup_failure() => {
                debug!(ticker = %ticker, error = %e, "No earnings calendar");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn straddle_predicted_movement(&self, ticker: &Ticker) -> Result<Option<Decimal>> {
        self.estimator.predicted_movement(&self.source, ticker).await
    }
}
