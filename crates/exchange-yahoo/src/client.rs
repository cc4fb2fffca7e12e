//! Yahoo Finance REST client.
//!
//! Yahoo throttles unauthenticated clients aggressively, so every network
//! request waits on a governor quota (two requests per five seconds by
//! default) and successful bodies go into a [`ResponseCache`]. A cache hit
//! never touches the limiter.

use crate::types::{
    date_epoch, epoch_date, ChartResponse, ChartResult, OptionChainResult, OptionSet,
    OptionsResponse, QuoteSummaryResponse,
};
use chrono::NaiveDate;
use earnings_core::{OptionRight, ProviderError, Result, Ticker, YahooConfig};
use earnings_data::ResponseCache;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// Constants
// =============================================================================

/// Yahoo Finance query host.
pub const YAHOO_API_URL: &str = "https://query2.finance.yahoo.com";

const DEFAULT_REQUESTS_PER_PERIOD: NonZeroU32 = nonzero!(2u32);
const DEFAULT_PERIOD: Duration = Duration::from_secs(5);
const DEFAULT_MAX_RETRIES: u32 = 2;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct YahooClientConfig {
    pub base_url: String,
    /// Requests allowed per `period`, also the burst size.
    pub requests_per_period: NonZeroU32,
    pub period: Duration,
    pub timeout_secs: u64,
    /// Extra attempts after a retryable failure (429, 5xx, network).
    pub max_retries: u32,
}

impl Default for YahooClientConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_API_URL.to_string(),
            requests_per_period: DEFAULT_REQUESTS_PER_PERIOD,
            period: DEFAULT_PERIOD,
            timeout_secs: 30,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&YahooConfig> for YahooClientConfig {
    fn from(config: &YahooConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            requests_per_period: NonZeroU32::new(config.requests_per_period)
                .unwrap_or(DEFAULT_REQUESTS_PER_PERIOD),
            period: Duration::from_secs(config.period_secs),
            timeout_secs: config.timeout_secs,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl YahooClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_rate(mut self, requests: NonZeroU32, period: Duration) -> Self {
        self.requests_per_period = requests;
        self.period = period;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    fn quota(&self) -> Result<Quota> {
        let per_request = self.period / self.requests_per_period.get();
        let quota = Quota::with_period(per_request).ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "rate limit period must be positive, got {:?}",
                self.period
            ))
        })?;
        Ok(quota.allow_burst(self.requests_per_period))
    }
}

// =============================================================================
// YahooClient
// =============================================================================

type Limiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct YahooClient {
    config: YahooClientConfig,
    http: Client,
    rate_limiter: Arc<Limiter>,
    cache: Arc<ResponseCache>,
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_period", &self.config.requests_per_period)
            .field("period", &self.config.period)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl YahooClient {
    /// Creates a client sharing the given response cache.
    ///
    /// # Errors
    /// Returns error if the quota is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: YahooClientConfig, cache: Arc<ResponseCache>) -> Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::direct(config.quota()?));
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)")
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            rate_limiter,
            cache,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// GET `path?query`, served from the cache when fresh.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = if query.is_empty() {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}{}?{}", self.config.base_url, path, query)
        };

        if let Some(body) = self.cache.get(&url) {
            debug!("Cache hit {}", url);
            return Ok(serde_json::from_str(&body)?);
        }

        let body = self.fetch_with_retry(&url).await?;
        let parsed = serde_json::from_str(&body)?;

        // insert rewrites the whole file, so keep it off the runtime threads
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || cache.insert(url, body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist response cache"),
            Err(e) => warn!(error = %e, "Response cache write task failed"),
        }
        Ok(parsed)
    }

    /// Network GET, retried up to `max_retries` times on retryable errors
    /// after the delay the error suggests.
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            self.rate_limiter.until_ready().await;
            debug!("GET {}", url);
            let outcome = match self.http.get(url).send().await {
                Ok(response) => Self::handle_response(url, response).await,
                Err(e) => Err(e.into()),
            };

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = e.retry_delay_secs().unwrap_or(1);
                    warn!(url = %url, error = %e, attempt, delay_secs = delay, "Retrying request");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                outcome => return outcome,
            }
        }
    }

    async fn handle_response(url: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ProviderError::rate_limited(retry_after));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(status.as_u16(), text));
        }

        Ok(response.text().await?)
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// One-day chart, which carries the current market price.
    ///
    /// # Errors
    /// [`ProviderError::NotFound`] for unknown symbols.
    pub async fn chart(&self, ticker: &Ticker) -> Result<ChartResult> {
        let response: ChartResponse = self
            .get(&format!("/v8/finance/chart/{ticker}"), "range=1d&interval=1d")
            .await?;
        first_result(response.chart.result, ticker, "chart")
    }

    /// Option chain summary; with `expiry`, also the contracts for that date.
    ///
    /// # Errors
    /// [`ProviderError::UnexpectedResponse`] if Yahoo returns no chain.
    pub async fn option_chain(
        &self,
        ticker: &Ticker,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionChainResult> {
        let query = expiry
            .map(|date| format!("date={}", date_epoch(date)))
            .unwrap_or_default();
        let response: OptionsResponse = self
            .get(&format!("/v7/finance/options/{ticker}"), &query)
            .await?;
        first_result(response.option_chain.result, ticker, "option chain")
    }

    /// Contracts listed for one expiration.
    ///
    /// # Errors
    /// Returns error if the chain request fails.
    pub async fn option_set(&self, ticker: &Ticker, expiry: NaiveDate) -> Result<Option<OptionSet>> {
        let chain = self.option_chain(ticker, Some(expiry)).await?;
        Ok(chain
            .options
            .into_iter()
            .find(|set| epoch_date(set.expiration_date) == Some(expiry)))
    }

    /// Announced earnings dates.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn earnings_calendar(&self, ticker: &Ticker) -> Result<Vec<NaiveDate>> {
        let response: QuoteSummaryResponse = self
            .get(
                &format!("/v10/finance/quoteSummary/{ticker}"),
                "modules=calendarEvents",
            )
            .await?;
        let summary = first_result(response.quote_summary.result, ticker, "quote summary")?;

        Ok(summary
            .calendar_events
            .and_then(|events| events.earnings)
            .map(|earnings| {
                earnings
                    .earnings_date
                    .iter()
                    .filter_map(|value| epoch_date(value.raw))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Last traded price of one contract, `None` if that strike is not listed.
    ///
    /// # Errors
    /// Returns error if the chain request fails.
    pub async fn option_last_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        let Some(set) = self.option_set(ticker, expiry).await? else {
            return Ok(None);
        };
        let contracts = match right {
            OptionRight::Call => &set.calls,
            OptionRight::Put => &set.puts,
        };
        Ok(contracts
            .iter()
            .find(|contract| contract.strike == strike)
            .and_then(|contract| contract.last_price))
    }
}

fn first_result<T>(results: Vec<T>, ticker: &Ticker, what: &str) -> Result<T> {
    results
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::UnexpectedResponse(format!("no {what} for {ticker}")))
}
