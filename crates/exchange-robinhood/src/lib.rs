//! Robinhood integration for the earnings statistics tools.
//!
//! This crate provides:
//! - An authenticated REST client with a bounded request pool
//! - Options chain, quote and earnings calendar lookups
//! - Upcoming-earnings and watchlist discovery
//! - Filled option order history for the trade journal
//!
//! # Authentication
//!
//! Robinhood uses an OAuth password grant. Credentials are read by the CLI
//! from `RH_USERNAME`, `RH_PASSWORD` and optionally `RH_MFA_CODE`:
//!
//! ```ignore
//! let client = RobinhoodClient::new(RobinhoodClientConfig::default())?;
//! client.login(&RobinhoodCredentials::new(user, password)).await?;
//! let price = client.latest_price(&Ticker::new("AAPL")?).await?;
//! client.logout().await;
//! ```

pub mod client;
mod source;
pub mod types;

pub use client::{RobinhoodClient, RobinhoodClientConfig, RobinhoodCredentials, ROBINHOOD_API_URL};
