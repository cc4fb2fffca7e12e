//! Report tables.
//!
//! [`TickerReport`] lays every statistic out next to a ticker's history;
//! [`SummaryTable`] holds one headline row per ticker for multi-ticker runs.

use crate::error::ReportError;
use crate::statistics::{StatValue, StatisticFactory, StatisticKind, StatisticSeries};
use chrono::NaiveDate;
use earnings_core::{MarketDataProvider, Ticker};
use earnings_data::HistoricalSeries;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::Arc;

const DATE_WIDTH: usize = 12;
const VALUE_WIDTH: usize = 28;

fn column_width(title: &str) -> usize {
    title.len().max(VALUE_WIDTH)
}

// =============================================================================
// Single-Ticker Report
// =============================================================================

/// A ticker's history with one column per statistic.
#[derive(Debug, Clone)]
pub struct TickerReport {
    pub ticker: Ticker,
    series: Arc<HistoricalSeries>,
    columns: Vec<StatisticSeries>,
}

impl TickerReport {
    /// Computes every statistic over `series`.
    ///
    /// # Errors
    /// Provider failures from the straddle statistics.
    pub async fn build(
        ticker: Ticker,
        series: HistoricalSeries,
        days: usize,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Result<Self, ReportError> {
        let series = Arc::new(series);
        let factory = StatisticFactory::new(days, provider, Arc::clone(&series), ticker.clone());
        let columns = factory.execute_all().await?;
        Ok(Self {
            ticker,
            series,
            columns,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[StatisticSeries] {
        &self.columns
    }

    /// Fixed-width table, most recent earnings first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{:<DATE_WIDTH$} {:>10}", "Earning Date", "Max Move");
        for column in &self.columns {
            let _ = write!(out, " {:>width$}", column.title, width = column_width(&column.title));
        }
        out.push('\n');

        for record in self.series.records() {
            let _ = write!(
                out,
                "{:<DATE_WIDTH$} {:>10}",
                record.earnings_date.to_string(),
                format!("{:.2}", record.max_move)
            );
            for column in &self.columns {
                let _ = write!(
                    out,
                    " {:>width$}",
                    column.get(record.ordinal).to_string(),
                    width = column_width(&column.title)
                );
            }
            out.push('\n');
        }
        out
    }
}

// =============================================================================
// Multi-Ticker Summary
// =============================================================================

/// Headline statistics for one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub ticker: Ticker,
    pub earnings_date: Option<NaiveDate>,
    pub values: Vec<StatValue>,
}

impl SummaryRow {
    /// Runs every statistic and keeps each column's most recent value.
    ///
    /// # Errors
    /// Provider failures from the statistics or the earnings lookup.
    pub async fn build(
        ticker: Ticker,
        series: HistoricalSeries,
        days: usize,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Result<Self, ReportError> {
        let earnings_date = provider.next_earnings_date(&ticker).await?;
        let factory = StatisticFactory::new(days, provider, Arc::new(series), ticker.clone());
        let columns = factory.execute_all().await?;
        Ok(Self {
            ticker,
            earnings_date,
            values: columns.iter().map(StatisticSeries::headline).collect(),
        })
    }

    fn profit_probability(&self) -> Option<Decimal> {
        let index = StatisticKind::ALL
            .iter()
            .position(|kind| *kind == StatisticKind::ProfitProbability)?;
        self.values.get(index).and_then(StatValue::as_decimal)
    }
}

/// Aggregate table for a multi-ticker run.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    titles: Vec<String>,
    rows: Vec<SummaryRow>,
}

impl Default for SummaryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryTable {
    /// Empty table with one column per statistic.
    #[must_use]
    pub fn new() -> Self {
        let titles = StatisticKind::ALL.iter().map(StatisticKind::title).collect();
        Self {
            titles,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highest profit probability first; rows without one go last, then
    /// ties break on ticker.
    pub fn sort_by_probability(&mut self) {
        self.rows.sort_by(|a, b| {
            match (a.profit_probability(), b.profit_probability()) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| a.ticker.cmp(&b.ticker))
        });
    }

    /// Fixed-width table with ticker and next earnings date first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{:<8} {:<DATE_WIDTH$}", "ticker", "earning date");
        for title in &self.titles {
            let _ = write!(out, " {:>width$}", title, width = column_width(title));
        }
        out.push('\n');

        for row in &self.rows {
            let date = row
                .earnings_date
                .map_or_else(|| "-".to_string(), |d| d.to_string());
            let _ = write!(out, "{:<8} {:<DATE_WIDTH$}", row.ticker.as_str(), date);
            for (title, value) in self.titles.iter().zip(&row.values) {
                let _ = write!(out, " {:>width$}", value.to_string(), width = column_width(title));
            }
            out.push('\n');
        }
        out
    }
}
