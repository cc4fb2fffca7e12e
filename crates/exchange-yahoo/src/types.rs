//! Yahoo Finance response payloads.
//!
//! Every endpoint wraps its data as `{ "<name>": { "result": [...], "error": ... } }`.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Vec::new")]
    pub result: Vec<T>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Chart
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: Envelope<ChartResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    pub regular_market_price: Option<Decimal>,
    pub previous_close: Option<Decimal>,
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub option_chain: Envelope<OptionChainResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChainResult {
    pub underlying_symbol: String,
    /// Expirations as Unix seconds at midnight UTC.
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub options: Vec<OptionSet>,
}

impl OptionChainResult {
    #[must_use]
    pub fn expirations(&self) -> Vec<NaiveDate> {
        self.expiration_dates
            .iter()
            .filter_map(|secs| epoch_date(*secs))
            .collect()
    }
}

/// Calls and puts for a single expiration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSet {
    pub expiration_date: i64,
    #[serde(default)]
    pub calls: Vec<OptionContract>,
    #[serde(default)]
    pub puts: Vec<OptionContract>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub contract_symbol: String,
    pub strike: Decimal,
    pub last_price: Option<Decimal>,
}

// =============================================================================
// Quote Summary
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResponse {
    pub quote_summary: Envelope<QuoteSummaryResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub calendar_events: Option<CalendarEvents>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvents {
    pub earnings: Option<EarningsEvents>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsEvents {
    #[serde(default)]
    pub earnings_date: Vec<FormattedValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormattedValue {
    pub raw: i64,
    pub fmt: Option<String>,
}

/// UTC calendar date of a Unix timestamp.
#[must_use]
pub fn epoch_date(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// Unix seconds at midnight UTC, the form Yahoo expects in `?date=`.
#[must_use]
pub fn date_epoch(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_conversions() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
        assert_eq!(date_epoch(date), 1_708_041_600);
        assert_eq!(epoch_date(1_708_041_600), Some(date));
        // mid-day timestamps fall on the same UTC date
        assert_eq!(epoch_date(1_708_041_600 + 13 * 3600), Some(date));
    }

    #[test]
    fn test_option_chain_deserializes_numbers() {
        let json = r#"{
            "optionChain": {
                "result": [{
                    "underlyingSymbol": "ACME",
                    "expirationDates": [1708041600],
                    "options": [{
                        "expirationDate": 1708041600,
                        "calls": [{"contractSymbol": "ACME240216C00100000", "strike": 100.0, "lastPrice": 2.5}],
                        "puts": []
                    }]
                }],
                "error": null
            }
        }"#;
        let response: OptionsResponse = serde_json::from_str(json).unwrap();
        let chain = &response.option_chain.result[0];
        assert_eq!(chain.expirations().len(), 1);
        assert_eq!(chain.options[0].calls[0].strike, rust_decimal::Decimal::ONE_HUNDRED);
    }
}
