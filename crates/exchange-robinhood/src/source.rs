use crate::client::RobinhoodClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use earnings_core::{OptionRight, OptionsDataSource, ProviderError, Result, Ticker};
use rust_decimal::Decimal;

#[async_trait]
impl OptionsDataSource for RobinhoodClient {
    fn name(&self) -> &'static str {
        "robinhood"
    }

    async fn exists(&self, ticker: &Ticker) -> Result<bool> {
        Ok(self.instrument(ticker).await?.is_some())
    }

    async fn earnings_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        let earnings = self.earnings(ticker).await?;
        Ok(earnings
            .into_iter()
            .filter_map(|e| e.report.map(|report| report.date))
            .collect())
    }

    async fn expiration_dates(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        Ok(self.chain(ticker).await?.expiration_dates)
    }

    async fn latest_price(&self, ticker: &Ticker) -> Result<Decimal> {
        let quote = self.quote(ticker).await?;
        quote
            .last_trade_price
            .or(quote.last_extended_hours_trade_price)
            .ok_or_else(|| ProviderError::UnexpectedResponse(format!("no trade price for {ticker}")))
    }

    async fn option_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        self.option_mark_price(ticker, expiry, strike, right).await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{RobinhoodClient, RobinhoodClientConfig, RobinhoodCredentials};
    use chrono::NaiveDate;
    use earnings_core::{
        MarketData, MarketDataProvider, OptionsDataSource, AppConfig, StraddleEstimator,
        Ticker,
    };
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> RobinhoodClient {
        Mock::given(method("POST"))
            .and(path("/oauth2/token/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "tok"})),
            )
            .mount(server)
            .await;
        let client =
            RobinhoodClient::new(RobinhoodClientConfig::default().with_base_url(server.uri()))
                .unwrap();
        client
            .login(&RobinhoodCredentials::new("trader", "pw"))
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_unknown_ticker_does_not_exist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instruments/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"results": [], "next": null})),
            )
            .mount(&server)
            .await;

        let client = client(&server).await;
        let ticker = Ticker::new("ZZZZ").unwrap();
        assert!(!client.exists(&ticker).await.unwrap());
    }

    #[tokio::test]
    async fn test_earnings_dates_skip_missing_reports() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/marketdata/earnings/"))
            .and(query_param("symbol", "ACME"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"symbol": "ACME", "report": {"date": "2024-01-25", "timing": "pm"}},
                    {"symbol": "ACME", "report": null},
                    {"symbol": "ACME", "report": {"date": "2024-04-25", "timing": "am"}}
                ],
                "next": null
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let dates = client
            .earnings_dates(&Ticker::new("ACME").unwrap())
            .await
            .unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 25).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 25).unwrap()
            ]
        );
    }

    #[tokio::test]
    async fn test_latest_price_falls_back_to_extended_hours() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quotes/ACME/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "ACME",
                "last_trade_price": null,
                "last_extended_hours_trade_price": "101.250000"
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let price = client
            .latest_price(&Ticker::new("ACME").unwrap())
            .await
            .unwrap();
        assert_eq!(price, dec!(101.25));
    }

    #[tokio::test]
    async fn test_no_chain_means_no_options_support() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/instruments/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": "i", "symbol": "ACME", "name": "Acme", "tradable_chain_id": null}],
                "next": null
            })))
            .mount(&server)
            .await;

        let provider = MarketData::new(
            Arc::new(client(&server).await),
            StraddleEstimator::new(AppConfig::default().straddle),
        );
        let ticker = Ticker::new("ACME").unwrap();
        assert!(provider.exists(&ticker).await.unwrap());
        assert!(!provider.supports_options(&ticker).await.unwrap());
    }
}
