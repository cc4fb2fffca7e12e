//! Core domain types.

use crate::error::ProviderError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum accepted symbol length.
const MAX_TICKER_LEN: usize = 10;

/// Upper-cased equity symbol, safe to embed in URLs and file paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parses and normalises a symbol.
    ///
    /// # Errors
    /// Returns [`ProviderError::InvalidRequest`] for empty, overlong or
    /// path-unsafe input.
    pub fn new(symbol: &str) -> Result<Self, ProviderError> {
        let symbol = symbol.trim().to_uppercase();

        if symbol.is_empty() {
            return Err(ProviderError::InvalidRequest("ticker cannot be empty".to_string()));
        }
        if symbol.len() > MAX_TICKER_LEN {
            return Err(ProviderError::InvalidRequest(format!(
                "ticker exceeds maximum length of {MAX_TICKER_LEN}: {symbol}"
            )));
        }
        if symbol.contains("..")
            || !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ProviderError::InvalidRequest(format!(
                "ticker must contain only letters, digits, '.' or '-': {symbol}"
            )));
        }

        if !symbol.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(ProviderError::InvalidRequest(format!(
                "ticker must contain a letter or digit: {symbol}"
            )));
        }

        Ok(Self(symbol))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = ProviderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

/// Options contract right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// Lowercase wire name used by brokerage query strings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Call and put prices at one expiration and strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StraddleQuote {
    pub strike: Decimal,
    pub call: Decimal,
    pub put: Decimal,
}

impl StraddleQuote {
    /// Combined premium of both legs.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.call + self.put
    }
}
