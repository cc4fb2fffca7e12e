use super::{StatValue, Statistic, StatisticKind, StatisticSeries};
use async_trait::async_trait;
use earnings_core::Result;
use earnings_data::{HistoricalEarningsRecord, HistoricalSeries};
use rust_decimal::Decimal;
use std::ops::Range;
use std::sync::Arc;

/// Lookback windows over a most-recent-first series of `len` rows.
///
/// With `days < len` there are `len - days` full windows of `days` rows.
/// Otherwise every row starts a window that runs to the oldest record.
/// Window `i` is keyed by the ordinal of its first row, `len - 1 - i`.
pub(crate) fn windows(len: usize, days: usize) -> impl Iterator<Item = (usize, Range<usize>)> {
    let width = days.min(len);
    let count = if days < len { len - days } else { len };
    (0..count).map(move |i| (len - 1 - i, i..(i + width).min(len)))
}

fn abs_moves(records: &[HistoricalEarningsRecord]) -> Vec<Decimal> {
    records.iter().map(|r| r.max_move.abs()).collect()
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    sum.checked_div(Decimal::from(values.len()))
}

fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
    } else {
        Some(sorted[mid])
    }
}

fn windowed(
    title: String,
    series: &HistoricalSeries,
    days: usize,
    aggregate: fn(&[Decimal]) -> Option<Decimal>,
) -> StatisticSeries {
    let moves = abs_moves(series.records());
    let mut column = StatisticSeries::new(title);
    for (key, range) in windows(moves.len(), days) {
        let value = aggregate(&moves[range]).map_or(StatValue::Missing, StatValue::Number);
        column.values.insert(key, value);
    }
    column
}

// =============================================================================
// Close Percent
// =============================================================================

/// Close-to-before change per earnings event, in percent.
#[derive(Debug)]
pub struct ClosePercent {
    series: Arc<HistoricalSeries>,
}

impl ClosePercent {
    pub fn new(series: Arc<HistoricalSeries>) -> Self {
        Self { series }
    }
}

#[async_trait]
impl Statistic for ClosePercent {
    fn kind(&self) -> StatisticKind {
        StatisticKind::ClosePercent
    }

    fn title(&self) -> String {
        self.kind().title()
    }

    async fn execute(&self) -> Result<StatisticSeries> {
        let mut column = StatisticSeries::new(self.title());
        for record in self.series.records() {
            let value = (record.close_price - record.price_before)
                .checked_div(record.price_before)
                .map_or(StatValue::Missing, |ratio| {
                    StatValue::Number(ratio * Decimal::ONE_HUNDRED)
                });
            column.values.insert(record.ordinal, value);
        }
        Ok(column)
    }
}

// =============================================================================
// Max Mean / Max Median
// =============================================================================

/// Mean absolute max move over each lookback window.
#[derive(Debug)]
pub struct MaxMean {
    series: Arc<HistoricalSeries>,
    days: usize,
}

impl MaxMean {
    pub fn new(series: Arc<HistoricalSeries>, days: usize) -> Self {
        Self { series, days }
    }
}

#[async_trait]
impl Statistic for MaxMean {
    fn kind(&self) -> StatisticKind {
        StatisticKind::MaxMean
    }

    fn title(&self) -> String {
        self.kind().title()
    }

    async fn execute(&self) -> Result<StatisticSeries> {
        Ok(windowed(self.title(), &self.series, self.days, mean))
    }
}

/// Median absolute max move over each lookback window.
#[derive(Debug)]
pub struct MaxMedian {
    series: Arc<HistoricalSeries>,
    days: usize,
}

impl MaxMedian {
    pub fn new(series: Arc<HistoricalSeries>, days: usize) -> Self {
        Self { series, days }
    }
}

#[async_trait]
impl Statistic for MaxMedian {
    fn kind(&self) -> StatisticKind {
        StatisticKind::MaxMedian
    }

    fn title(&self) -> String {
        self.kind().title()
    }

    async fn execute(&self) -> Result<StatisticSeries> {
        Ok(windowed(self.title(), &self.series, self.days, median))
    }
}
