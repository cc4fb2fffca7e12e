//! Straddle-implied earnings move.
//!
//! Finds the first expiration on or after the next earnings date, prices
//! the at-the-money straddle there and expresses it as a percentage of the
//! underlying. Strikes are walked upward from the rounded spot price until
//! both legs are listed; the walk is bounded by a timeout.

use crate::config::StraddleConfig;
use crate::dates::closest_on_or_after;
use crate::error::{ProviderError, Result};
use crate::traits::OptionsDataSource;
use crate::types::{OptionRight, StraddleQuote, Ticker};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, trace, warn};

/// A priced straddle and the move it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StraddleEstimate {
    pub earnings_date: NaiveDate,
    pub expiration: NaiveDate,
    pub latest_price: Decimal,
    pub quote: StraddleQuote,
    pub predicted_move_pct: Decimal,
}

/// `round(100 * straddle / latest, 2)`, or `None` for a zero price.
#[must_use]
pub fn predicted_move_percent(straddle: Decimal, latest: Decimal) -> Option<Decimal> {
    (straddle * Decimal::ONE_HUNDRED)
        .checked_div(latest)
        .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

#[derive(Debug, Clone)]
pub struct StraddleEstimator {
    config: StraddleConfig,
}

impl StraddleEstimator {
    #[must_use]
    pub fn new(config: StraddleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StraddleConfig {
        &self.config
    }

    /// Prices the post-earnings straddle.
    ///
    /// Returns `Ok(None)` when there is no upcoming earnings date or no
    /// expiration after it.
    ///
    /// # Errors
    /// [`ProviderError::Timeout`] if no strike with both legs is found in
    /// time; any provider error from the underlying lookups.
    pub async fn estimate<S>(&self, source: &S, ticker: &Ticker) -> Result<Option<StraddleEstimate>>
    where
        S: OptionsDataSource + ?Sized,
    {
        let today = source.today();
        let earnings = source.earnings_dates(ticker).await?;
        let Some(earnings_date) = closest_on_or_after(today, &earnings) else {
            debug!(ticker = %ticker, %today, "No upcoming earnings date");
            return Ok(None);
        };

        let expirations = source.expiration_dates(ticker).await?;
        let Some(expiration) = closest_on_or_after(earnings_date, &expirations) else {
            debug!(
                ticker = %ticker,
                %earnings_date,
                expirations = expirations.len(),
                "No expiration on or after earnings"
            );
            return Ok(None);
        };

        let latest_price = source.latest_price(ticker).await?;
        if latest_price <= Decimal::ZERO {
            return Err(ProviderError::UnexpectedResponse(format!(
                "non-positive latest price {latest_price} for {ticker}"
            )));
        }

        let timeout = self.config.timeout();
        let quote = tokio::time::timeout(
            timeout,
            self.find_straddle(source, ticker, expiration, latest_price),
        )
        .await
        .map_err(|_| {
            ProviderError::Timeout(format!(
                "no straddle for {ticker} expiring {expiration} within {}s",
                timeout.as_secs()
            ))
        })??;

        let predicted_move_pct = predicted_move_percent(quote.total(), latest_price)
            .ok_or_else(|| ProviderError::UnexpectedResponse("zero latest price".to_string()))?;

        debug!(
            ticker = %ticker,
            %earnings_date,
            %expiration,
            strike = %quote.strike,
            straddle = %quote.total(),
            %predicted_move_pct,
            "Priced straddle"
        );

        Ok(Some(StraddleEstimate {
            earnings_date,
            expiration,
            latest_price,
            quote,
            predicted_move_pct,
        }))
    }

    /// Like [`Self::estimate`] but treats a search timeout as "no prediction".
    ///
    /// # Errors
    /// Any provider error other than a timeout.
    pub async fn predicted_movement<S>(&self, source: &S, ticker: &Ticker) -> Result<Option<Decimal>>
    where
        S: OptionsDataSource + ?Sized,
    {
        match self.estimate(source, ticker).await {
            Ok(estimate) => Ok(estimate.map(|e| e.predicted_move_pct)),
            Err(ProviderError::Timeout(reason)) => {
                warn!(ticker = %ticker, %reason, "Straddle search timed out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn find_straddle<S>(
        &self,
        source: &S,
        ticker: &Ticker,
        expiry: NaiveDate,
        latest_price: Decimal,
    ) -> Result<StraddleQuote>
    where
        S: OptionsDataSource + ?Sized,
    {
        let mut strike = latest_price.round();
        loop {
            let (call, put) = tokio::try_join!(
                source.option_price(ticker, expiry, strike, OptionRight::Call),
                source.option_price(ticker, expiry, strike, OptionRight::Put),
            )?;

            if let (Some(call), Some(put)) = (call, put) {
                return Ok(StraddleQuote { strike, call, put });
            }

            trace!(ticker = %ticker, %strike, "Strike missing a leg, widening");
            strike = (strike + self.config.strike_increment).round_dp(1);
            tokio::time::sleep(self.config.retry_delay()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubSource;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config() -> StraddleConfig {
        StraddleConfig {
            strike_increment: dec!(0.5),
            timeout_secs: 10,
            retry_delay_ms: 250,
        }
    }

    fn ticker() -> Ticker {
        Ticker::new("ACME").unwrap()
    }

    // ==================== Rounding Tests ====================

    #[test]
    fn test_predicted_move_percent() {
        assert_eq!(predicted_move_percent(dec!(5.0), dec!(200)), Some(dec!(2.5)));
        assert_eq!(predicted_move_percent(dec!(4.05), dec!(100)), Some(dec!(4.05)));
        assert_eq!(predicted_move_percent(dec!(1), dec!(3)), Some(dec!(33.33)));
        assert_eq!(predicted_move_percent(dec!(2), dec!(3)), Some(dec!(66.67)));
    }

    #[test]
    fn test_predicted_move_percent_zero_price() {
        assert_eq!(predicted_move_percent(dec!(5), Decimal::ZERO), None);
    }

    // ==================== Estimate Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_estimate_uses_first_expiration_after_earnings() {
        let mut source = StubSource::new(d(2024, 2, 1))
            .with_straddle(dec!(200), dec!(2.4), dec!(2.6));
        source.earnings = vec![d(2023, 11, 1), d(2024, 3, 1)];
        source.expirations = vec![d(2024, 2, 16), d(2024, 3, 15)];
        source.latest = dec!(200);

        let estimate = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(estimate.earnings_date, d(2024, 3, 1));
        assert_eq!(estimate.expiration, d(2024, 3, 15));
        assert_eq!(estimate.quote.total(), dec!(5.0));
        assert_eq!(estimate.predicted_move_pct, dec!(2.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_the_money_straddle_on_round_price() {
        let mut source = StubSource::new(d(2024, 2, 1))
            .with_straddle(dec!(100), dec!(2.10), dec!(1.95));
        source.earnings = vec![d(2024, 2, 20)];
        source.expirations = vec![d(2024, 2, 23)];
        source.latest = dec!(100.0);

        let estimate = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(estimate.quote.strike, dec!(100));
        assert_eq!(estimate.quote.total(), dec!(4.05));
        assert_eq!(estimate.predicted_move_pct, dec!(4.05));
        assert_eq!(source.tried(), vec![dec!(100)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strike_widens_in_half_steps() {
        let mut source = StubSource::new(d(2024, 2, 1))
            .with_straddle(dec!(101), dec!(2), dec!(2));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 3, 15)];
        source.latest = dec!(100.2);

        let estimate = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(estimate.quote.strike, dec!(101));
        assert_eq!(source.tried(), vec![dec!(100), dec!(100.5), dec!(101.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_sided_strike_is_skipped() {
        let mut source = StubSource::new(d(2024, 2, 1)).with_straddle(dec!(50.5), dec!(1), dec!(1.5));
        source.legs.push((dec!(50), OptionRight::Call, dec!(1.2)));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 3, 15)];
        source.latest = dec!(50);

        let estimate = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(estimate.quote.strike, dec!(50.5));
        assert_eq!(estimate.predicted_move_pct, dec!(5));
    }

    #[tokio::test]
    async fn test_no_future_earnings_is_none() {
        let mut source = StubSource::new(d(2024, 6, 1));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 6, 21)];

        let result = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(source.tried().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_is_none() {
        let mut source = StubSource::new(d(2024, 2, 1));
        source.earnings = vec![d(2024, 3, 1)];

        let result = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_positive_price_is_error() {
        let mut source = StubSource::new(d(2024, 2, 1));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 3, 15)];
        source.latest = Decimal::ZERO;

        let err = StraddleEstimator::new(config())
            .estimate(&source, &ticker())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnexpectedResponse(_)));
    }

    // ==================== Timeout Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_search_times_out() {
        let mut source = StubSource::new(d(2024, 2, 1));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 3, 15)];

        let estimator = StraddleEstimator::new(config());
        let err = estimator.estimate(&source, &ticker()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert!(source.tried().len() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicted_movement_maps_timeout_to_none() {
        let mut source = StubSource::new(d(2024, 2, 1));
        source.earnings = vec![d(2024, 3, 1)];
        source.expirations = vec![d(2024, 3, 15)];

        let result = StraddleEstimator::new(config())
            .predicted_movement(&source, &ticker())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_predicted_movement_propagates_other_errors() {
        let mut source = StubSource::new(d(2024, 2, 1));
        source.earnings = vec![d(2024, 3, 1)];
        source.fail_expirations = Some(|| ProviderError::Network("down".into()));

        let err = StraddleEstimator::new(config())
            .predicted_movement(&source, &ticker())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
