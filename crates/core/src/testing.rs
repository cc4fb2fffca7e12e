//! In-memory data source for unit tests.

use crate::error::{ProviderError, Result};
use crate::traits::OptionsDataSource;
use crate::types::{OptionRight, Ticker};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Mutex;

pub(crate) struct StubSource {
    pub today: NaiveDate,
    pub exists: bool,
    pub earnings: Vec<NaiveDate>,
    pub expirations: Vec<NaiveDate>,
    pub latest: Decimal,
    pub legs: Vec<(Decimal, OptionRight, Decimal)>,
    pub fail_expirations: Option<fn() -> ProviderError>,
    pub fail_earnings: Option<fn() -> ProviderError>,
    pub strikes_tried: Mutex<Vec<Decimal>>,
}

impl StubSource {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            exists: true,
            earnings: Vec::new(),
            expirations: Vec::new(),
            latest: Decimal::ONE_HUNDRED,
            legs: Vec::new(),
            fail_expirations: None,
            fail_earnings: None,
            strikes_tried: Mutex::new(Vec::new()),
        }
    }

    pub fn with_straddle(mut self, strike: Decimal, call: Decimal, put: Decimal) -> Self {
        self.legs.push((strike, OptionRight::Call, call));
        self.legs.push((strike, OptionRight::Put, put));
        self
    }

    pub fn tried(&self) -> Vec<Decimal> {
        self.strikes_tried.lock().unwrap().clone()
    }
}

#[async_trait]
impl OptionsDataSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        if self.exists {
            Ok(true)
        } else {
            Err(ProviderError::NotFound(ticker.to_string()))
        }
    }

    async fn earnings_dates(&self, _ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        match self.fail_earnings {
            Some(fail) => Err(fail()),
            None => Ok(self.earnings.clone()),
        }
    }

    async fn expiration_dates(&self, _ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        match self.fail_expirations {
            Some(fail) => Err(fail()),
            None => Ok(self.expirations.clone()),
        }
    }

    async fn latest_price(&self, _ticker: &Ticker) -> Result<Decimal> {
        Ok(self.latest)
    }

    async fn option_price(
        &self,
        _ticker: &Ticker,
        _expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        if right == OptionRight::Call {
            self.strikes_tried.lock().unwrap().push(strike);
        }
        Ok(self
            .legs
            .iter()
            .find(|(s, r, _)| *s == strike && *r == right)
            .map(|(_, _, price)| *price))
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
