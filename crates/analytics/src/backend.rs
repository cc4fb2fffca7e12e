//! Market-data backend selection.
//!
//! The set of backends is closed: [`MarketDataBackend`] names them and
//! [`ClientFactory`] builds the matching [`MarketClient`]. Callers talk to
//! the client through [`MarketDataProvider`] and ask it for the few
//! backend-specific operations directly.

use earnings_core::{
    AppConfig, MarketData, MarketDataProvider, ProviderError, Result, StraddleEstimator, Ticker,
    Traced,
};
use earnings_data::{OptionOrderRecord, ResponseCache};
use earnings_robinhood::{RobinhoodClient, RobinhoodClientConfig, RobinhoodCredentials};
use earnings_yahoo::{YahooClient, YahooClientConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketDataBackend {
    #[default]
    Robinhood,
    Yahoo,
}

impl MarketDataBackend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Robinhood => "robinhood",
            Self::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for MarketDataBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketDataBackend {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "robinhood" | "rh" => Ok(Self::Robinhood),
            "yahoo" | "yfinance" => Ok(Self::Yahoo),
            other => Err(ProviderError::InvalidRequest(format!(
                "unknown data source '{other}', expected robinhood or yahoo"
            ))),
        }
    }
}

// =============================================================================
// MarketClient
// =============================================================================

/// A live backend client.
#[derive(Debug, Clone)]
pub enum MarketClient {
    Robinhood(Arc<RobinhoodClient>),
    Yahoo(Arc<YahooClient>),
}

impl MarketClient {
    #[must_use]
    pub fn backend(&self) -> MarketDataBackend {
        match self {
            Self::Robinhood(_) => MarketDataBackend::Robinhood,
            Self::Yahoo(_) => MarketDataBackend::Yahoo,
        }
    }

    /// Ticker-level provider over this client, with call tracing.
    #[must_use]
    pub fn provider(&self, estimator: StraddleEstimator) -> Arc<dyn MarketDataProvider> {
        match self {
            Self::Robinhood(client) => Arc::new(MarketData::new(
                Traced::new(Arc::clone(client)),
                estimator,
            )),
            Self::Yahoo(client) => Arc::new(MarketData::new(
                Traced::new(Arc::clone(client)),
                estimator,
            )),
        }
    }

    /// Tickers reporting earnings soon.
    ///
    /// # Errors
    /// [`ProviderError::Unsupported`] for backends without discovery.
    pub async fn upcoming_earnings(&self) -> Result<Vec<Ticker>> {
        match self {
            Self::Robinhood(client) => client.upcoming_earnings_tickers().await,
            Self::Yahoo(_) => Err(ProviderError::unsupported("yahoo", "upcoming earnings")),
        }
    }

    /// Watchlist name to symbols.
    ///
    /// # Errors
    /// [`ProviderError::Unsupported`] for backends without watchlists.
    pub async fn watchlists(&self) -> Result<BTreeMap<String, Vec<String>>> {
        match self {
            Self::Robinhood(client) => client.watchlist_symbols().await,
            Self::Yahoo(_) => Err(ProviderError::unsupported("yahoo", "watchlists")),
        }
    }

    /// Filled option orders, one row per leg.
    ///
    /// # Errors
    /// [`ProviderError::Unsupported`] for backends without an account.
    pub async fn option_orders(&self) -> Result<Vec<OptionOrderRecord>> {
        match self {
            Self::Robinhood(client) => client.option_order_history().await,
            Self::Yahoo(_) => Err(ProviderError::unsupported("yahoo", "option orders")),
        }
    }

    /// Ends the session, if the backend has one.
    pub async fn logout(&self) {
        if let Self::Robinhood(client) = self {
            client.logout().await;
        }
    }
}

// =============================================================================
// ClientFactory
// =============================================================================

/// Builds logged-in clients from configuration.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    config: AppConfig,
}

impl ClientFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Straddle estimator configured for this run.
    #[must_use]
    pub fn estimator(&self) -> StraddleEstimator {
        StraddleEstimator::new(self.config.straddle.clone())
    }

    /// Creates a client for `backend`.
    ///
    /// # Errors
    /// [`ProviderError::Authentication`] if Robinhood is chosen without
    /// credentials, or the login error.
    pub async fn create(
        &self,
        backend: MarketDataBackend,
        credentials: Option<&RobinhoodCredentials>,
    ) -> Result<MarketClient> {
        match backend {
            MarketDataBackend::Robinhood => {
                let credentials = credentials.ok_or_else(|| {
                    ProviderError::Authentication(
                        "Robinhood needs RH_USERNAME and RH_PASSWORD".to_string(),
                    )
                })?;
                let client =
                    RobinhoodClient::new(RobinhoodClientConfig::from(&self.config.robinhood))?;
                client.login(credentials).await?;
                Ok(MarketClient::Robinhood(Arc::new(client)))
            }
            MarketDataBackend::Yahoo => {
                let yahoo = &self.config.yahoo;
                let ttl = chrono::Duration::seconds(
                    i64::try_from(yahoo.cache_ttl_secs).unwrap_or(i64::MAX),
                );
                let cache = Arc::new(ResponseCache::open(&yahoo.cache_path, ttl));
                let client = YahooClient::new(YahooClientConfig::from(yahoo), cache)?;
                info!(cache = %yahoo.cache_path.display(), "Using Yahoo Finance");
                Ok(MarketClient::Yahoo(Arc::new(client)))
            }
        }
    }
}
