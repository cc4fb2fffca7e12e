//! Test doubles shared by the analytics tests.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use earnings_core::{MarketDataProvider, ProviderError, Result, Ticker};
use earnings_data::{HistoricalEarningsRecord, HistoricalSeries};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn record(date: &str, max_move: Decimal) -> HistoricalEarningsRecord {
    HistoricalEarningsRecord {
        ordinal: 0,
        earnings_date: date.parse().unwrap(),
        option_type: None,
        strike_price: None,
        price_before: Decimal::ONE_HUNDRED,
        close_price: Decimal::ONE_HUNDRED,
        max_move,
        one_day_high: Decimal::ONE_HUNDRED,
        one_day_low: Decimal::ONE_HUNDRED,
    }
}

/// A series with the given max moves, most recent first, one quarter apart.
pub fn series_with_moves(moves: &[Decimal]) -> HistoricalSeries {
    let latest = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
    let records = moves
        .iter()
        .enumerate()
        .map(|(i, max_move)| {
            let date = latest - Days::new(91 * i as u64);
            record(&date.to_string(), *max_move)
        })
        .collect();
    HistoricalSeries::from_records(records)
}

#[derive(Debug, Default)]
pub struct StubProvider {
    pub missing: bool,
    pub no_options: bool,
    pub no_earnings: bool,
    pub next_earnings: Option<NaiveDate>,
    pub prediction: Option<Decimal>,
    pub prediction_error: Option<fn() -> ProviderError>,
    pub calls: AtomicUsize,
    pub predictions: AtomicUsize,
}

impl StubProvider {
    pub fn with_prediction(mut self, prediction: Option<Decimal>) -> Self {
        self.prediction = prediction;
        self
    }

    pub fn with_prediction_error(mut self, error: fn() -> ProviderError) -> Self {
        self.prediction_error = Some(error);
        self
    }

    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    /// Provider lookups made, excluding predictions.
    pub fn lookups(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prediction_calls(&self) -> usize {
        self.predictions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn exists(&self, _ticker: &Ticker) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.missing)
    }

    async fn supports_options(&self, _ticker: &Ticker) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.no_options)
    }

    async fn has_future_earnings_dates(&self, _ticker: &Ticker) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.no_earnings)
    }

    async fn next_earnings_date(&self, _ticker: &Ticker) -> Result<Option<NaiveDate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_earnings)
    }

    async fn straddle_predicted_movement(&self, _ticker: &Ticker) -> Result<Option<Decimal>> {
        self.predictions.fetch_add(1, Ordering::SeqCst);
        match self.prediction_error {
            Some(error) => Err(error()),
            None => Ok(self.prediction),
        }
    }
}
