//! Yahoo Finance integration for the earnings statistics tools.
//!
//! This crate provides:
//! - A rate-limited REST client backed by a persistent response cache
//! - Quote, option chain and earnings calendar lookups
//!
//! No login is required. Discovery of upcoming earnings is not offered by
//! this backend.

pub mod client;
mod source;
pub mod types;

pub use client::{YahooClient, YahooClientConfig, YAHOO_API_URL};
