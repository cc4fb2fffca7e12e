//! Logging interceptor for data sources.

use crate::error::Result;
use crate::traits::OptionsDataSource;
use crate::types::{OptionRight, Ticker};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, warn};

/// Wraps a source and logs every call with its duration and outcome.
#[derive(Debug)]
pub struct Traced<S> {
    inner: S,
}

impl<S: OptionsDataSource> Traced<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    async fn observe<T, F>(&self, operation: &'static str, ticker: &Ticker, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let started = Instant::now();
        debug!(source = self.inner.name(), operation, ticker = %ticker, "Provider call");
        let result = call.await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => debug!(
                source = self.inner.name(),
                operation,
                ticker = %ticker,
                elapsed_ms,
                "Provider call finished"
            ),
            Err(e) => warn!(
                source = self.inner.name(),
                operation,
                ticker = %ticker,
                elapsed_ms,
                error = %e,
                "Provider call failed"
            ),
        }
        result
    }
}

#[async_trait]
impl<S: OptionsDataSource> OptionsDataSource for Traced<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        self.observe("exists", ticker, self.inner.exists(ticker)).await
    }

    async fn earnings_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        self.observe("earnings_dates", ticker, self.inner.earnings_dates(ticker))
            .await
    }

    async fn expiration_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        self.observe("expiration_dates", ticker, self.inner.expiration_dates(ticker))
            .await
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<Decimal> {
        self.observe("latest_price", ticker, self.inner.latest_price(ticker))
            .await
    }

    async fn option_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        self.observe(
            "option_price",
            ticker,
            self.inner.option_price(ticker, expiry, strike, right),
        )
        .await
    }

    fn today(&self) -> NaiveDate {
        self.inner.today()
    }
}
