//! Robinhood REST API client.
//!
//! One client holds one login session. Every request waits for a permit
//! from a shared semaphore so no more than `concurrency_limit` calls are in
//! flight at once. Call [`RobinhoodClient::logout`] when done; dropping a
//! still-logged-in client revokes its token in the background.

use crate::types::{
    Chain, Earnings, Instrument, MarketTag, OptionInstrument, OptionMarketData, OptionOrder, Page,
    Quote, TokenResponse, Watchlist, WatchlistItem,
};
use chrono::NaiveDate;
use earnings_core::{OptionRight, ProviderError, Result, RobinhoodConfig, Ticker};
use earnings_data::OptionOrderRecord;
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

// =============================================================================
// Constants
// =============================================================================

/// Robinhood production API base URL.
pub const ROBINHOOD_API_URL: &str = "https://api.robinhood.com";

/// Public OAuth client id used by the Robinhood web and mobile apps.
const CLIENT_ID: &str = "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS";

/// Market tag listing stocks that report soon.
const UPCOMING_EARNINGS_TAG: &str = "upcoming-earnings";

const DEFAULT_MAX_RETRIES: u32 = 2;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct RobinhoodClientConfig {
    pub base_url: String,
    /// Maximum requests in flight.
    pub concurrency_limit: usize,
    pub timeout_secs: u64,
    /// Extra attempts after a retryable failure (429, 5xx, network).
    pub max_retries: u32,
}

impl Default for RobinhoodClientConfig {
    fn default() -> Self {
        Self {
            base_url: ROBINHOOD_API_URL.to_string(),
            concurrency_limit: 2,
            timeout_secs: 30,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&RobinhoodConfig> for RobinhoodClientConfig {
    fn from(config: &RobinhoodConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            concurrency_limit: config.concurrency_limit,
            timeout_secs: config.timeout_secs,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RobinhoodClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Login details. Only the username is ever formatted.
pub struct RobinhoodCredentials {
    pub username: String,
    pub password: SecretString,
    pub mfa_code: Option<SecretString>,
}

impl RobinhoodCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            mfa_code: None,
        }
    }

    #[must_use]
    pub fn with_mfa_code(mut self, code: impl Into<String>) -> Self {
        self.mfa_code = Some(SecretString::from(code.into()));
        self
    }
}

impl std::fmt::Debug for RobinhoodCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobinhoodCredentials")
            .field("username", &self.username)
            .field("has_mfa_code", &self.mfa_code.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RobinhoodClient
// =============================================================================

pub struct RobinhoodClient {
    config: RobinhoodClientConfig,
    http: Client,
    permits: Arc<Semaphore>,
    session: Mutex<Option<SecretString>>,
    device_token: String,
    /// ticker -> options chain id
    chain_ids: Mutex<HashMap<Ticker, String>>,
}

impl std::fmt::Debug for RobinhoodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobinhoodClient")
            .field("base_url", &self.config.base_url)
            .field("concurrency_limit", &self.config.concurrency_limit)
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl RobinhoodClient {
    /// Creates a client. No request is made until [`Self::login`].
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: RobinhoodClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))?;
        let permits = Arc::new(Semaphore::new(config.concurrency_limit.max(1)));

        Ok(Self {
            config,
            http,
            permits,
            session: Mutex::new(None),
            device_token: uuid::Uuid::new_v4().to_string(),
            chain_ids: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.lock().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Logs in with a password grant.
    ///
    /// # Errors
    /// [`ProviderError::LoginFailed`] if the server refuses; the error
    /// never includes the password or MFA code.
    pub async fn login(&self, credentials: &RobinhoodCredentials) -> Result<()> {
        let url = self.url("/oauth2/token/");
        let mut form = vec![
            ("client_id", CLIENT_ID.to_string()),
            ("expires_in", "86400".to_string()),
            ("grant_type", "password".to_string()),
            ("scope", "internal".to_string()),
            ("username", credentials.username.clone()),
            ("password", credentials.password.expose_secret().to_string()),
            ("device_token", self.device_token.clone()),
            ("challenge_type", "sms".to_string()),
        ];
        if let Some(code) = &credentials.mfa_code {
            form.push(("mfa_code", code.expose_secret().to_string()));
        }

        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::login_failed(&url, format!("{status}: unreadable response ({e})"))
        })?;

        match body.access_token {
            Some(token) if status.is_success() => {
                *self.session.lock() = Some(SecretString::from(token));
                info!(username = %credentials.username, "Logged in to Robinhood");
                Ok(())
            }
            _ if body.mfa_required == Some(true) => Err(ProviderError::login_failed(
                &url,
                "multi-factor code required",
            )),
            _ => Err(ProviderError::login_failed(
                &url,
                format!("{status}: {}", body.detail.unwrap_or_else(|| "no token".to_string())),
            )),
        }
    }

    /// Revokes the session token. Safe to call more than once; failures
    /// are logged, not returned.
    pub async fn logout(&self) {
        let Some(token) = self.session.lock().take() else {
            return;
        };
        let url = self.url("/oauth2/revoke_token/");
        let form = [("client_id", CLIENT_ID), ("token", token.expose_secret())];
        match self.http.post(&url).form(&form).send().await {
            Ok(response) if response.status().is_success() => info!("Logged out of Robinhood"),
            Ok(response) => warn!(status = %response.status(), "Token revoke rejected"),
            Err(e) => warn!(error = %e, "Token revoke failed"),
        }
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Authenticated GET, retried up to `max_retries` times on retryable
    /// errors after the delay the error suggests.
    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_once(url, query).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = e.retry_delay_secs().unwrap_or(1);
                    warn!(url = %url, error = %e, attempt, delay_secs = delay, "Retrying request");
                    tokio::time::sleep(std::time::Duration::from_secs(delay)).await;
                }
                outcome => return outcome,
            }
        }
    }

    /// Waits for a permit and makes one GET. The permit is released before
    /// any retry delay.
    async fn get_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let bearer = self
            .session
            .lock()
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
            .ok_or_else(|| ProviderError::Authentication("not logged in".to_string()))?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ProviderError::Network(format!("request pool closed: {e}")))?;

        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .header("Authorization", bearer)
            .send()
            .await?;

        Self::handle_response(url, response).await
    }

    /// Follows `next` links and concatenates every page.
    async fn get_all<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut page: Page<T> = self.get(&self.url(path), query).await?;
        let mut items = std::mem::take(&mut page.results);
        while let Some(next) = page.next.take() {
            page = self.get(&next, &[]).await?;
            items.append(&mut page.results);
        }
        Ok(items)
    }

    async fn handle_response<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
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
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Authentication(format!("{status} from {url}")));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::api(status.as_u16(), text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }

    // =========================================================================
    // Instruments & Quotes
    // =========================================================================

    /// Looks up the equity instrument for a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn instrument(&self, ticker: &Ticker) -> Result<Option<Instrument>> {
        let page: Page<Instrument> = self
            .get(&self.url("/instruments/"), &[("symbol", ticker.as_str())])
            .await?;
        Ok(page.results.into_iter().find(|i| i.symbol == ticker.as_str()))
    }

    /// Latest quote for a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn quote(&self, ticker: &Ticker) -> Result<Quote> {
        self.get(&self.url(&format!("/quotes/{ticker}/")), &[]).await
    }

    /// Earnings calendar entries, past and upcoming.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn earnings(&self, ticker: &Ticker) -> Result<Vec<Earnings>> {
        self.get_all("/marketdata/earnings/", &[("symbol", ticker.as_str())])
            .await
    }

    // =========================================================================
    // Options
    // =========================================================================

    async fn chain_id(&self, ticker: &Ticker) -> Result<String> {
        if let Some(id) = self.chain_ids.lock().get(ticker) {
            return Ok(id.clone());
        }

        let instrument = self
            .instrument(ticker)
            .await?
            .ok_or_else(|| ProviderError::NotFound(ticker.to_string()))?;
        let id = instrument.tradable_chain_id.ok_or_else(|| {
            ProviderError::UnexpectedResponse(format!("{ticker} has no tradable option chain"))
        })?;

        self.chain_ids.lock().insert(ticker.clone(), id.clone());
        Ok(id)
    }

    /// Options chain with its expiration dates.
    ///
    /// # Errors
    /// [`ProviderError::UnexpectedResponse`] if the ticker has no chain.
    pub async fn chain(&self, ticker: &Ticker) -> Result<Chain> {
        let id = self.chain_id(ticker).await?;
        self.get(&self.url(&format!("/options/chains/{id}/")), &[])
            .await
    }

    /// Active option contracts at one expiration, strike and right.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn option_instruments(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Vec<OptionInstrument>> {
        let chain_id = self.chain_id(ticker).await?;
        let expiry = expiry.to_string();
        let strike = strike.normalize().to_string();
        self.get_all(
            "/options/instruments/",
            &[
                ("chain_id", chain_id.as_str()),
                ("expiration_dates", expiry.as_str()),
                ("strike_price", strike.as_str()),
                ("type", right.as_str()),
                ("state", "active"),
            ],
        )
        .await
    }

    /// Market data snapshot for one option contract.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn option_market_data(&self, option_id: &str) -> Result<OptionMarketData> {
        self.get(&self.url(&format!("/marketdata/options/{option_id}/")), &[])
            .await
    }

    /// Mark price of a contract, `None` if not listed or unpriced.
    ///
    /// # Errors
    /// Returns error if a request fails.
    pub async fn option_mark_price(
        &self,
        ticker: &Ticker,
        expiry: NaiveDate,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Option<Decimal>> {
        let contracts = self.option_instruments(ticker, expiry, strike, right).await?;
        let Some(contract) = contracts.first() else {
            return Ok(None);
        };
        Ok(self.option_market_data(&contract.id).await?.mark_price)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Symbols carrying the `upcoming-earnings` market tag.
    ///
    /// # Errors
    /// Returns error if the tag or an instrument lookup fails.
    pub async fn upcoming_earnings_tickers(&self) -> Result<Vec<Ticker>> {
        let tag: MarketTag = self
            .get(
                &self.url(&format!("/midlands/tags/tag/{UPCOMING_EARNINGS_TAG}/")),
                &[],
            )
            .await?;

        let instruments: Vec<Instrument> = stream::iter(tag.instruments)
            .map(|url| async move { self.get::<Instrument>(&url, &[]).await })
            .buffered(self.config.concurrency_limit.max(1))
            .try_collect()
            .await?;

        let tickers = instruments
            .into_iter()
            .filter_map(|instrument| match Ticker::new(&instrument.symbol) {
                Ok(ticker) => Some(ticker),
                Err(e) => {
                    warn!(symbol = %instrument.symbol, error = %e, "Skipping unusable symbol");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = tickers.len(), "Fetched upcoming earnings tickers");
        Ok(tickers)
    }

    /// Watchlist name to symbols, across all of the user's lists.
    ///
    /// # Errors
    /// Returns error if a request fails.
    pub async fn watchlist_symbols(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let lists: Vec<Watchlist> = self.get_all("/midlands/lists/default/", &[]).await?;

        let mut symbols = BTreeMap::new();
        for list in lists {
            let items: Vec<WatchlistItem> = self
                .get_all("/midlands/lists/items/", &[("list_id", list.id.as_str())])
                .await?;
            let list_symbols = items.into_iter().filter_map(|item| item.symbol).collect();
            symbols.insert(list.display_name, list_symbols);
        }
        Ok(symbols)
    }

    // =========================================================================
    // Order History
    // =========================================================================

    /// Filled option orders, one record per leg.
    ///
    /// # Errors
    /// Returns error if a request fails.
    pub async fn option_order_history(&self) -> Result<Vec<OptionOrderRecord>> {
        let orders: Vec<OptionOrder> = self.get_all("/options/orders/", &[]).await?;
        let mut contracts: HashMap<String, OptionInstrument> = HashMap::new();
        let mut records = Vec::new();

        for order in orders.into_iter().filter(|o| o.state == "filled") {
            for leg in &order.legs {
                if !contracts.contains_key(&leg.option) {
                    let contract: OptionInstrument = self.get(&leg.option, &[]).await?;
                    contracts.insert(leg.option.clone(), contract);
                }
                let Some(contract) = contracts.get(&leg.option) else {
                    continue;
                };

                records.push(OptionOrderRecord {
                    chain_symbol: contract.chain_symbol.clone(),
                    expiration_date: contract.expiration_date.to_string(),
                    strike_price: contract.strike_price,
                    option_type: contract.option_type.clone(),
                    side: leg.side.clone(),
                    order_created_at: order.created_at.clone(),
                    direction: order.direction.clone(),
                    order_quantity: order.quantity,
                    order_type: order.order_type.clone(),
                    opening_strategy: order.opening_strategy.clone(),
                    closing_strategy: order.closing_strategy.clone(),
                    price: order.price.unwrap_or_default(),
                    processed_quantity: order.processed_quantity,
                });
            }
        }

        debug!(legs = records.len(), "Fetched option order history");
        Ok(records)
    }
}

impl Drop for RobinhoodClient {
    fn drop(&mut self) {
        let Some(token) = self.session.get_mut().take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let http = self.http.clone();
        let url = self.url("/oauth2/revoke_token/");
        handle.spawn(async move {
            let form = [("client_id", CLIENT_ID), ("token", token.expose_secret())];
            if let Err(e) = http.post(&url).form(&form).send().await {
                debug!(error = %e, "Background token revoke failed");
            }
        });
    }
}
