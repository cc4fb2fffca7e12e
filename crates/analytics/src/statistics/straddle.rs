use super::{SharedPrediction, StatValue, Statistic, StatisticKind, StatisticSeries};
use async_trait::async_trait;
use earnings_core::Result;
use earnings_data::HistoricalSeries;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

// =============================================================================
// Straddle Predicted Move
// =============================================================================

/// The market's implied move, placed on the most recent record.
#[derive(Debug)]
pub struct StraddlePredictedMove {
    series: Arc<HistoricalSeries>,
    prediction: Arc<SharedPrediction>,
}

impl StraddlePredictedMove {
    pub fn new(series: Arc<HistoricalSeries>, prediction: Arc<SharedPrediction>) -> Self {
        Self { series, prediction }
    }
}

#[async_trait]
impl Statistic for StraddlePredictedMove {
    fn kind(&self) -> StatisticKind {
        StatisticKind::StraddlePredictedMove
    }

    fn title(&self) -> String {
        self.kind().title()
    }

    async fn execute(&self) -> Result<StatisticSeries> {
        let predicted = self.prediction.get().await?;
        let mut column = StatisticSeries::new(self.title());
        let key = self.series.len().saturating_sub(1);
        column
            .values
            .insert(key, predicted.map_or(StatValue::Missing, StatValue::Number));
        Ok(column)
    }
}

// =============================================================================
// Profit Probability
// =============================================================================

/// Share of recent earnings whose absolute max move beat the implied move.
///
/// A move equal to the prediction is not a win.
#[derive(Debug)]
pub struct ProfitProbability {
    series: Arc<HistoricalSeries>,
    days: usize,
    prediction: Arc<SharedPrediction>,
}

impl ProfitProbability {
    pub fn new(series: Arc<HistoricalSeries>, days: usize, prediction: Arc<SharedPrediction>) -> Self {
        Self {
            series,
            days,
            prediction,
        }
    }
}

#[async_trait]
impl Statistic for ProfitProbability {
    fn kind(&self) -> StatisticKind {
        StatisticKind::ProfitProbability
    }

    fn title(&self) -> String {
        self.kind().title()
    }

    async fn execute(&self) -> Result<StatisticSeries> {
        let mut column = StatisticSeries::new(self.title());
        let len = self.series.len();
        let window = self.days.min(len);

        if window == 0 {
            column.values.insert(0, StatValue::Number(Decimal::ZERO));
            return Ok(column);
        }

        let Some(predicted) = self.prediction.get().await? else {
            column.values.insert(len - 1, StatValue::Missing);
            return Ok(column);
        };

        let wins = self.series.records()[..window]
            .iter()
            .filter(|record| predicted < record.max_move.abs())
            .count();
        let percent = (Decimal::from(wins) / Decimal::from(window) * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        column.values.insert(
            len - 1,
            StatValue::Probability {
                percent,
                wins,
                window,
            },
        );
        Ok(column)
    }
}
