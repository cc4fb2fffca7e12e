//! Historical earnings files.
//!
//! One CSV per ticker, as exported by the earnings-history site. Rows are
//! loaded most recent first; each record keeps a chronological `ordinal`
//! (0 = oldest) that statistic columns are keyed by.

use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const EARNING_DATE: &str = "Earning Date";
pub const OPTION_TYPE: &str = "Option Type";
pub const STRIKE_PRICE: &str = "Strike Price";
pub const PRICE_BEFORE: &str = "Price Before";
pub const CLOSE_PRICE: &str = "Close Price";
pub const MAX_MOVE: &str = "Max Move";
pub const ONE_DAY_HIGH: &str = "One Day High";
pub const ONE_DAY_LOW: &str = "One Day Low";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%b %d, %Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Markers that identify an HTML page saved in place of a CSV.
const MARKUP_MARKERS: [&str; 7] = [
    "<!doctype html",
    "<html",
    "<head",
    "<body",
    "<script",
    "<form",
    "<title",
];

/// One past earnings event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalEarningsRecord {
    /// Chronological position, 0 = oldest.
    pub ordinal: usize,
    pub earnings_date: NaiveDate,
    pub option_type: Option<String>,
    pub strike_price: Option<Decimal>,
    pub price_before: Decimal,
    pub close_price: Decimal,
    /// Largest post-earnings move, in percent.
    pub max_move: Decimal,
    pub one_day_high: Decimal,
    pub one_day_low: Decimal,
}

/// Earnings history for one ticker, most recent first.
#[derive(Debug, Clone, Default)]
pub struct HistoricalSeries {
    records: Vec<HistoricalEarningsRecord>,
}

struct Columns {
    earnings_date: usize,
    option_type: Option<usize>,
    strike_price: Option<usize>,
    price_before: usize,
    close_price: usize,
    max_move: usize,
    one_day_high: usize,
    one_day_low: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| find(name).ok_or(DataError::MissingColumn(name));

        Ok(Self {
            earnings_date: require(EARNING_DATE)?,
            option_type: find(OPTION_TYPE),
            strike_price: find(STRIKE_PRICE),
            price_before: require(PRICE_BEFORE)?,
            close_price: require(CLOSE_PRICE)?,
            max_move: require(MAX_MOVE)?,
            one_day_high: require(ONE_DAY_HIGH)?,
            one_day_low: require(ONE_DAY_LOW)?,
        })
    }
}

impl HistoricalSeries {
    /// Loads a series from a CSV file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, a required column is
    /// missing, or a value does not parse.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let series = Self::from_reader(file)?;
        debug!(path = %path.display(), records = series.len(), "Loaded earnings history");
        Ok(series)
    }

    /// Loads a series from any CSV source.
    ///
    /// # Errors
    /// Same as [`Self::from_csv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns = Columns::from_headers(reader.headers()?)?;

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            // header is line 1
            let line = i + 2;
            if row.iter().all(str::is_empty) {
                continue;
            }

            let field = |idx: usize| row.get(idx).unwrap_or("");
            let required = |idx: usize, column: &'static str| {
                parse_number(field(idx)).ok_or_else(|| DataError::parse(line, column, field(idx)))
            };

            records.push(HistoricalEarningsRecord {
                ordinal: 0,
                earnings_date: parse_date(field(columns.earnings_date))
                    .ok_or_else(|| DataError::parse(line, EARNING_DATE, field(columns.earnings_date)))?,
                option_type: columns
                    .option_type
                    .map(field)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                strike_price: columns.strike_price.map(field).and_then(parse_number),
                price_before: required(columns.price_before, PRICE_BEFORE)?,
                close_price: required(columns.close_price, CLOSE_PRICE)?,
                max_move: required(columns.max_move, MAX_MOVE)?,
                one_day_high: required(columns.one_day_high, ONE_DAY_HIGH)?,
                one_day_low: required(columns.one_day_low, ONE_DAY_LOW)?,
            });
        }

        Ok(Self::from_records(records))
    }

    /// Orders records most recent first and assigns ordinals.
    #[must_use]
    pub fn from_records(mut records: Vec<HistoricalEarningsRecord>) -> Self {
        records.sort_by(|a, b| b.earnings_date.cmp(&a.earnings_date));
        let n = records.len();
        for (i, record) in records.iter_mut().enumerate() {
            record.ordinal = n - 1 - i;
        }
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records, most recent first.
    #[must_use]
    pub fn records(&self) -> &[HistoricalEarningsRecord] {
        &self.records
    }

    /// The most recent earnings event.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoricalEarningsRecord> {
        self.records.first()
    }

    /// Looks up a record by ordinal.
    #[must_use]
    pub fn by_ordinal(&self, ordinal: usize) -> Option<&HistoricalEarningsRecord> {
        let n = self.records.len();
        (ordinal < n).then(|| &self.records[n - 1 - ordinal])
    }
}

/// Parses numbers such as `"$1,234.50"`, `"-3.2%"` or `"12"`.
#[must_use]
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '%' | '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parses the date formats seen in exported history files.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// True if `content` looks like an HTML page rather than tabular data.
#[must_use]
pub fn looks_like_markup(content: &str) -> bool {
    let lowered = content.to_ascii_lowercase();
    MARKUP_MARKERS.iter().any(|marker| lowered.contains(marker))
}
