use crate::client::YahooClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use earnings_core::{OptionRight, OptionsDataSource, ProviderError, Result, Ticker};
use rust_decimal::Decimal;

#[async_trait]
impl OptionsDataSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        match self.chart(ticker).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn earnings_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        self.earnings_calendar(ticker).await
    }

    async fn expiration_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        Ok(self.option_chain(ticker, None).await?.expirations())
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<Decimal> {
        let chart = self.chart(ticker).await?;
        chart
            .meta
            .regular_market_price
            .or(chart.meta.previous_close)
            .ok_or_else(|| ProviderError::UnexpectedResponse(format!("no market price for {ticker}")))
    }

    async fn option_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        self.option_last_price(ticker, expiry, strike, right).await
    }
}
