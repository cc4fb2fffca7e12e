//! End-to-end report runs against a mocked Yahoo Finance.

use chrono::NaiveDate;
use earnings_analytics::{
    ClientFactory, MarketDataBackend, StatValue, SummaryRow, TickerReport, ValidationError,
    ValidatorFactory, ValidatorKind,
};
use earnings_core::{AppConfig, Ticker};
use earnings_data::{earnings_path, HistoricalSeries};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// 2099-01-15 and 2099-01-16, midnight UTC
const EARNINGS_EPOCH: i64 = 4_072_118_400;
const EXPIRY_EPOCH: i64 = 4_072_204_800;
// 2020-01-15, midnight UTC
const PAST_EARNINGS_EPOCH: i64 = 1_579_046_400;

const HISTORY: &str = "\
Earning Date,Price Before,Close Price,Max Move,One Day High,One Day Low
2023-04-20,100.00,109.00,10.0%,110.00,99.00
2023-07-20,100.00,97.00,-3.0%,101.00,97.00
2023-10-19,100.00,108.00,9.0%,109.00,99.50
";

async fn mock_yahoo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ACME"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "chart": {"result": [{"meta": {"symbol": "ACME", "regularMarketPrice": 100.0}}], "error": null}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v7/finance/options/ACME"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "optionChain": {
                "result": [{
                    "underlyingSymbol": "ACME",
                    "expirationDates": [EXPIRY_EPOCH],
                    "options": [{
                        "expirationDate": EXPIRY_EPOCH,
                        "calls": [{"contractSymbol": "ACME990116C00100000", "strike": 100.0, "lastPrice": 4.5}],
                        "puts": [{"contractSymbol": "ACME990116P00100000", "strike": 100.0, "lastPrice": 3.5}]
                    }]
                }],
                "error": null
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/ACME"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "quoteSummary": {
                "result": [{
                    "calendarEvents": {
                        "earnings": {"earningsDate": [{"raw": EARNINGS_EPOCH, "fmt": "2099-01-15"}]}
                    }
                }],
                "error": null
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// A listed, optionable ticker whose only earnings date is in the past.
async fn mock_reported(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/DONE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "chart": {"result": [{"meta": {"symbol": "DONE", "regularMarketPrice": 50.0}}], "error": null}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v7/finance/options/DONE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "optionChain": {
                "result": [{"underlyingSymbol": "DONE", "expirationDates": [EXPIRY_EPOCH], "options": []}],
                "error": null
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/DONE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "quoteSummary": {
                "result": [{
                    "calendarEvents": {
                        "earnings": {"earningsDate": [{"raw": PAST_EARNINGS_EPOCH, "fmt": "2020-01-15"}]}
                    }
                }],
                "error": null
            }
        })))
        .mount(server)
        .await;
}

fn config(server: &MockServer, dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.yahoo.api_url = server.uri();
    config.yahoo.requests_per_period = 100;
    config.yahoo.period_secs = 1;
    config.yahoo.cache_path = dir.path().join("cache/yahoo.json");
    config.report.data_dir = dir.path().join("data");
    config
}

fn write_history(config: &AppConfig, ticker: &Ticker) -> PathBuf {
    let path = earnings_path(&config.report.data_dir, ticker);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, HISTORY).unwrap();
    path
}

#[tokio::test]
async fn test_summary_row_from_mocked_yahoo() {
    let server = MockServer::start().await;
    mock_yahoo(&server).await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let ticker = Ticker::new("ACME").unwrap();
    let path = write_history(&config, &ticker);

    let factory = ClientFactory::new(config);
    let client = factory.create(MarketDataBackend::Yahoo, None).await.unwrap();
    let provider = client.provider(factory.estimator());

    ValidatorFactory::new(ticker.clone(), &path, provider.clone())
        .validate_all()
        .await
        .unwrap();

    let series = HistoricalSeries::from_csv(&path).unwrap();
    let row = SummaryRow::build(ticker, series, 30, provider).await.unwrap();

    assert_eq!(row.earnings_date, NaiveDate::from_ymd_opt(2099, 1, 15));
    // straddle 4.5 + 3.5 on a 100 underlying
    assert_eq!(row.values[3], StatValue::Number(Decimal::new(8, 0)));
    // |10| and |9| beat 8, |-3| does not
    assert_eq!(row.values[4].to_string(), "66.67% (2/3)");
    client.logout().await;
}

#[tokio::test]
async fn test_ticker_report_renders_history() {
    let server = MockServer::start().await;
    mock_yahoo(&server).await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let ticker = Ticker::new("ACME").unwrap();
    let path = write_history(&config, &ticker);

    let factory = ClientFactory::new(config);
    let client = factory.create(MarketDataBackend::Yahoo, None).await.unwrap();
    let report = TickerReport::build(
        ticker,
        HistoricalSeries::from_csv(&path).unwrap(),
        2,
        client.provider(factory.estimator()),
    )
    .await
    .unwrap();

    let rendered = report.render();
    assert_eq!(rendered.lines().count(), 4);
    assert!(rendered.contains("2023-10-19"));
    assert!(rendered.contains("straddle_predicted_move %"));
}

#[tokio::test]
async fn test_unknown_ticker_fails_validation() {
    let server = MockServer::start().await;
    mock_yahoo(&server).await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let ticker = Ticker::new("NOPE").unwrap();
    let path = earnings_path(&config.report.data_dir, &ticker);

    let factory = ClientFactory::new(config);
    let client = factory.create(MarketDataBackend::Yahoo, None).await.unwrap();

    let err = ValidatorFactory::new(ticker, path, client.provider(factory.estimator()))
        .validate_all()
        .await
        .unwrap_err();

    assert!(matches!(err, ValidationError::InvalidTicker(t) if t.as_str() == "NOPE"));
}

#[tokio::test]
async fn test_past_earnings_fail_after_download() {
    let server = MockServer::start().await;
    mock_reported(&server).await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let ticker = Ticker::new("DONE").unwrap();
    let path = write_history(&config, &ticker);

    let factory = ClientFactory::new(config);
    let client = factory.create(MarketDataBackend::Yahoo, None).await.unwrap();
    let validators = ValidatorFactory::new(ticker, path, client.provider(factory.estimator()));

    validators.validate(&[ValidatorKind::Ticker]).await.unwrap();
    let err = validators
        .validate(&ValidatorKind::AFTER_DOWNLOAD)
        .await
        .unwrap_err();

    assert!(matches!(err, ValidationError::InvalidEarnings(t) if t.as_str() == "DONE"));
}
