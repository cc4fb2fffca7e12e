use crate::error::Result;
use crate::types::{OptionRight, Ticker};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Raw lookups a market-data backend must answer.
///
/// Backends report absence as empty collections or `None` where the
/// signature allows it and use [`crate::ProviderError`] kinds for
/// everything else.
#[async_trait]
pub trait OptionsDataSource: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn exists(&self, ticker: &Ticker) -> Result<bool>;

    /// Known earnings dates, past and future, in any order.
    async fn earnings_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>>;

    /// Listed option expiration dates, in any order.
    async fn expiration_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>>;

    /// Most recent traded price of the underlying.
    async fn latest_price(&self, ticker: &Ticker) -> Result<Decimal>;

    /// Price of one option leg, or `None` if no contract is listed at
    /// that strike.
    async fn option_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>>;

    /// Reference date for "future" earnings.
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[async_trait]
impl<S: OptionsDataSource + ?Sized> OptionsDataSource for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        (**self).exists(ticker).await
    }

    async fn earnings_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        (**self).earnings_dates(ticker).await
    }

    async fn expiration_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        (**self).expiration_dates(ticker).await
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<Decimal> {
        (**self).latest_price(ticker).await
    }

    async fn option_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        (**self).option_price(ticker, expiry, strike, right).await
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Ticker-level questions the statistics and validators ask.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn exists(&self, ticker: &Ticker) -> Result<bool>;

    async fn supports_options(&self, ticker: &Ticker) -> Result<bool>;

    async fn has_future_earnings_dates(&self, ticker: &Ticker) -> Result<bool>;

    async fn next_earnings_date(&self, ticker: &Ticker) -> Result<Option<NaiveDate>>;

    /// Straddle-implied move in percent of the underlying, rounded to two
    /// decimals. `None` when no straddle could be priced.
    async fn straddle_predicted_movement(&self, ticker: &Ticker) -> Result<Option<Decimal>>;
}
