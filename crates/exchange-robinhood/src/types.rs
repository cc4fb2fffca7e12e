//! Robinhood API payloads.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Paginated list envelope used by most endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub mfa_required: Option<bool>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub simple_name: Option<String>,
    #[serde(default)]
    pub name: String,
    pub tradable_chain_id: Option<String>,
}

impl Instrument {
    /// Display name, preferring the short form.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.simple_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chain {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub expiration_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Earnings {
    pub symbol: String,
    pub report: Option<EarningsReport>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EarningsReport {
    pub date: NaiveDate,
    /// `am` or `pm`.
    pub timing: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionInstrument {
    pub id: String,
    pub chain_symbol: String,
    pub expiration_date: NaiveDate,
    pub strike_price: Decimal,
    #[serde(rename = "type")]
    pub option_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionMarketData {
    pub mark_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_trade_price: Option<Decimal>,
    pub last_extended_hours_trade_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketTag {
    #[serde(default)]
    pub instruments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Watchlist {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistItem {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionOrder {
    pub created_at: String,
    pub direction: String,
    pub state: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub opening_strategy: Option<String>,
    pub closing_strategy: Option<String>,
    pub price: Option<Decimal>,
    pub processed_quantity: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub legs: Vec<OptionLeg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionLeg {
    /// URL of the leg's option instrument.
    pub option: String,
    pub side: String,
}
