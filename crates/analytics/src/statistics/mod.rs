//! Historical earnings statistics.
//!
//! Every statistic produces a [`StatisticSeries`] keyed by record ordinal,
//! so columns line up with the historical rows they describe. The most
//! recent record has ordinal `len - 1`.

mod movement;
mod straddle;

pub use movement::{ClosePercent, MaxMean, MaxMedian};
pub use straddle::{ProfitProbability, StraddlePredictedMove};

use async_trait::async_trait;
use earnings_core::{MarketDataProvider, ProviderError, Result, Ticker};
use earnings_data::HistoricalSeries;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

// =============================================================================
// Values
// =============================================================================

/// One cell of a statistic column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatValue {
    Number(Decimal),
    Probability {
        percent: Decimal,
        wins: usize,
        window: usize,
    },
    Missing,
}

impl StatValue {
    /// Numeric value used for sorting. `None` for [`StatValue::Missing`].
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Probability { percent, .. } => Some(*percent),
            Self::Missing => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{:.2}", value),
            Self::Probability {
                percent,
                wins,
                window,
            } => write!(f, "{:.2}% ({}/{})", percent, wins, window),
            Self::Missing => write!(f, "-"),
        }
    }
}

/// A titled statistic column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticSeries {
    pub title: String,
    pub values: BTreeMap<usize, StatValue>,
}

impl StatisticSeries {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            values: BTreeMap::new(),
        }
    }

    /// Value at a record ordinal, [`StatValue::Missing`] if none.
    #[must_use]
    pub fn get(&self, ordinal: usize) -> StatValue {
        self.values
            .get(&ordinal)
            .copied()
            .unwrap_or(StatValue::Missing)
    }

    /// Value for the most recent record that has one.
    #[must_use]
    pub fn headline(&self) -> StatValue {
        self.values
            .last_key_value()
            .map_or(StatValue::Missing, |(_, value)| *value)
    }
}

// =============================================================================
// Statistic Kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    ClosePercent,
    MaxMean,
    MaxMedian,
    StraddlePredictedMove,
    ProfitProbability,
}

impl StatisticKind {
    /// Every statistic, in report column order.
    pub const ALL: [StatisticKind; 5] = [
        Self::ClosePercent,
        Self::MaxMean,
        Self::MaxMedian,
        Self::StraddlePredictedMove,
        Self::ProfitProbability,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosePercent => "close_percent",
            Self::MaxMean => "max_mean",
            Self::MaxMedian => "max_median",
            Self::StraddlePredictedMove => "straddle_predicted_move",
            Self::ProfitProbability => "profit_probability",
        }
    }

    /// Column title in reports.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::ClosePercent => self.as_str().to_string(),
            Self::MaxMean | Self::MaxMedian => format!("n day {} %", self.as_str()),
            Self::StraddlePredictedMove | Self::ProfitProbability => format!("{} %", self.as_str()),
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Statistic: Send + Sync {
    fn kind(&self) -> StatisticKind;

    fn title(&self) -> String;

    /// Computes the column.
    ///
    /// # Errors
    /// Provider failures other than an estimator timeout.
    async fn execute(&self) -> Result<StatisticSeries>;
}

// =============================================================================
// Shared Prediction
// =============================================================================

/// Straddle-implied move for one ticker, fetched at most once.
///
/// The predicted-move and profit-probability statistics both need it and
/// the estimator is the slowest call in a report.
pub struct SharedPrediction {
    provider: Arc<dyn MarketDataProvider>,
    ticker: Ticker,
    cell: OnceCell<Option<Decimal>>,
}

impl SharedPrediction {
    pub fn new(provider: Arc<dyn MarketDataProvider>, ticker: Ticker) -> Self {
        Self {
            provider,
            ticker,
            cell: OnceCell::new(),
        }
    }

    /// # Errors
    /// Returns the provider error; a failed fetch is retried on next call.
    pub async fn get(&self) -> Result<Option<Decimal>> {
        let value = self
            .cell
            .get_or_try_init(|| async {
                let predicted = self
                    .provider
                    .straddle_predicted_movement(&self.ticker)
                    .await?;
                debug!(ticker = %self.ticker, predicted = ?predicted, "Straddle predicted move");
                Ok::<_, ProviderError>(predicted)
            })
            .await?;
        Ok(*value)
    }
}

impl fmt::Debug for SharedPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPrediction")
            .field("ticker", &self.ticker)
            .field("resolved", &self.cell.get())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds statistics for one ticker over its loaded history.
pub struct StatisticFactory {
    days: usize,
    series: Arc<HistoricalSeries>,
    prediction: Arc<SharedPrediction>,
}

impl StatisticFactory {
    pub fn new(
        days: usize,
        provider: Arc<dyn MarketDataProvider>,
        series: Arc<HistoricalSeries>,
        ticker: Ticker,
    ) -> Self {
        Self {
            days,
            series,
            prediction: Arc::new(SharedPrediction::new(provider, ticker)),
        }
    }

    #[must_use]
    pub fn days(&self) -> usize {
        self.days
    }

    #[must_use]
    pub fn series(&self) -> &HistoricalSeries {
        &self.series
    }

    #[must_use]
    pub fn create(&self, kind: StatisticKind) -> Box<dyn Statistic> {
        let series = Arc::clone(&self.series);
        match kind {
            StatisticKind::ClosePercent => Box::new(ClosePercent::new(series)),
            StatisticKind::MaxMean => Box::new(MaxMean::new(series, self.days)),
            StatisticKind::MaxMedian => Box::new(MaxMedian::new(series, self.days)),
            StatisticKind::StraddlePredictedMove => Box::new(StraddlePredictedMove::new(
                series,
                Arc::clone(&self.prediction),
            )),
            StatisticKind::ProfitProbability => Box::new(ProfitProbability::new(
                series,
                self.days,
                Arc::clone(&self.prediction),
            )),
        }
    }

    /// Runs every statistic in column order.
    ///
    /// # Errors
    /// Stops at the first statistic that fails.
    pub async fn execute_all(&self) -> Result<Vec<StatisticSeries>> {
        let mut columns = Vec::with_capacity(StatisticKind::ALL.len());
        for kind in StatisticKind::ALL {
            let column = self.create(kind).execute().await?;
            debug!(statistic = %kind, values = column.values.len(), "Computed statistic");
            columns.push(column);
        }
        Ok(columns)
    }
}

impl fmt::Debug for StatisticFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticFactory")
            .field("days", &self.days)
            .field("records", &self.series.len())
            .field("prediction", &self.prediction)
            .finish()
    }
}
