//! Options trade journal.
//!
//! The journal file holds one row per filled order leg. Trades are rebuilt
//! by grouping opening legs on `(chain_symbol, opening_strategy,
//! order_created_at)` and pairing them with closing legs whose
//! `closing_strategy` matches the opening strategy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contract multiplier for US equity options.
const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// One filled order leg, as exported from the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOrderRecord {
    pub chain_symbol: String,
    pub expiration_date: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub strike_price: Decimal,
    pub option_type: String,
    pub side: String,
    pub order_created_at: String,
    /// `debit` or `credit`.
    pub direction: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub order_quantity: Decimal,
    pub order_type: String,
    pub opening_strategy: Option<String>,
    pub closing_strategy: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub processed_quantity: Decimal,
}

impl OptionOrderRecord {
    /// Identity used to de-duplicate appended rows.
    #[must_use]
    pub fn key(&self) -> (String, String, Decimal, String, String) {
        (
            self.chain_symbol.clone(),
            self.order_created_at.clone(),
            self.strike_price,
            self.option_type.clone(),
            self.side.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionStrategy {
    LongCall,
    LongCallSpread,
    LongPutSpread,
    LongPut,
    ShortCall,
    ShortCallSpread,
    ShortPutSpread,
    Straddle,
    Custom,
    IronCondor,
    Strangle,
}

impl OptionStrategy {
    /// Parses the brokerage's strategy label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let strategy = match label.trim() {
            "long_call" => Self::LongCall,
            "long_call_spread" => Self::LongCallSpread,
            "long_put_spread" => Self::LongPutSpread,
            "long_put" => Self::LongPut,
            "short_call" => Self::ShortCall,
            "short_call_spread" => Self::ShortCallSpread,
            "short_put_spread" => Self::ShortPutSpread,
            "straddle" | "long_straddle" => Self::Straddle,
            "custom" => Self::Custom,
            "iron_condor" => Self::IronCondor,
            "strangle" | "long_strangle" => Self::Strangle,
            _ => return None,
        };
        Some(strategy)
    }

    /// Maximum loss is bounded at entry.
    #[must_use]
    pub fn defined_risk(&self) -> bool {
        !matches!(self, Self::ShortCall | Self::Custom)
    }
}

/// An opening order group and whatever closed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalTrade {
    pub chain_symbol: String,
    pub strategy_label: String,
    pub strategy: Option<OptionStrategy>,
    pub opened_at: String,
    pub closed_at: Vec<String>,
    pub contracts: Decimal,
    pub strikes: Vec<Decimal>,
    pub premium_open: Decimal,
    pub premium_close: Option<Decimal>,
    /// Realised dollars; `None` while open or for custom strategies.
    pub profit: Option<Decimal>,
}

/// Signed premium per share: debits are paid, credits are received.
///
/// Every leg row repeats its order's net price, so each order counts once.
fn signed_premium(legs: &[&OptionOrderRecord]) -> Decimal {
    let mut orders: BTreeMap<&str, &OptionOrderRecord> = BTreeMap::new();
    for leg in legs {
        orders.entry(leg.order_created_at.as_str()).or_insert(*leg);
    }
    orders
        .values()
        .map(|leg| {
            if leg.direction.eq_ignore_ascii_case("credit") {
                leg.price
            } else {
                -leg.price
            }
        })
        .sum()
}

/// Rebuilds trades from journal rows, oldest first.
#[must_use]
pub fn group_trades(records: &[OptionOrderRecord]) -> Vec<JournalTrade> {
    let mut openings: BTreeMap<(String, String, String), Vec<&OptionOrderRecord>> = BTreeMap::new();
    let mut closings: BTreeMap<(String, String), Vec<&OptionOrderRecord>> = BTreeMap::new();

    for record in records {
        if let Some(strategy) = record.opening_strategy.as_deref().filter(|s| !s.is_empty()) {
            openings
                .entry((
                    record.order_created_at.clone(),
                    record.chain_symbol.clone(),
                    strategy.to_string(),
                ))
                .or_default()
                .push(record);
        }
        if let Some(strategy) = record.closing_strategy.as_deref().filter(|s| !s.is_empty()) {
            closings
                .entry((record.chain_symbol.clone(), strategy.to_string()))
                .or_default()
                .push(record);
        }
    }

    openings
        .into_iter()
        .map(|((opened_at, chain_symbol, label), legs)| {
            let close_legs = closings
                .get(&(chain_symbol.clone(), label.clone()))
                .map(|legs| {
                    legs.iter()
                        .copied()
                        .filter(|leg| leg.order_created_at > opened_at)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            let strategy = OptionStrategy::parse(&label);
            // each leg of a multi-leg order carries the full order quantity
            let contracts = legs.first().map_or(Decimal::ZERO, |leg| leg.order_quantity);
            let premium_open = signed_premium(&legs);
            let premium_close = (!close_legs.is_empty()).then(|| signed_premium(&close_legs));
            let profit = match (strategy, premium_close) {
                (Some(OptionStrategy::Custom) | None, _) | (_, None) => None,
                (Some(_), Some(close)) => Some((premium_open + close) * contracts * CONTRACT_MULTIPLIER),
            };

            let mut closed_at: Vec<String> = close_legs
                .iter()
                .map(|leg| leg.order_created_at.clone())
                .collect();
            closed_at.dedup();

            JournalTrade {
                chain_symbol,
                strategy_label: label,
                strategy,
                opened_at,
                closed_at,
                contracts,
                strikes: legs.iter().map(|leg| leg.strike_price).collect(),
                premium_open,
                premium_close,
                profit,
            }
        })
        .collect()
}
