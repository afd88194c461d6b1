//! Turns an arbitrary valuation dataset into canonical records.
//!
//! Two layouts are understood. A *preprocessed* dataset is already numeric,
//! expressed in millions of USD, with categories spread over one-hot
//! indicator columns. A *raw* dataset uses free-form headers and
//! currency-formatted strings such as `$1.2M`. Bad cells degrade to defaults;
//! only an unreadable source fails the operation.

use std::fmt;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::record::{
    CanonicalRecord, CompanyProfile, DEFAULT_FUNDING_AMOUNT, DEFAULT_FUNDING_ROUNDS,
    DEFAULT_MARKET_SHARE, DEFAULT_REVENUE, DEFAULT_TEAM_SIZE, DEFAULT_YEAR_FOUNDED,
    USD_PER_MILLION,
};
use crate::vocabulary::{CategoryField, OTHER_INDUSTRY};

/// Header whose presence marks a preprocessed dataset.
pub const PREPROCESSED_MARKER: &str = "Revenue (M USD)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Revenue,
    TeamSize,
    FundingRounds,
    FundingAmount,
    MarketShare,
    Profitable,
    YearFounded,
    Valuation,
    Industry,
    Region,
    ExitStatus,
}

const PREPROCESSED_COLUMNS: &[(&str, Field)] = &[
    (PREPROCESSED_MARKER, Field::Revenue),
    ("Employees", Field::TeamSize),
    ("Funding Rounds", Field::FundingRounds),
    ("Funding Amount (M USD)", Field::FundingAmount),
    ("Market Share (%)", Field::MarketShare),
    ("Profitable", Field::Profitable),
    ("Year Founded", Field::YearFounded),
    ("valuation", Field::Valuation),
    ("Valuation (M USD)", Field::Valuation),
];

const RAW_ALIASES: &[(&str, Field)] = &[
    ("Revenue", Field::Revenue),
    ("revenue", Field::Revenue),
    ("Team Size", Field::TeamSize),
    ("Employees", Field::TeamSize),
    ("team_size", Field::TeamSize),
    ("employees", Field::TeamSize),
    ("Funding Rounds", Field::FundingRounds),
    ("funding_rounds", Field::FundingRounds),
    ("Funding Amount", Field::FundingAmount),
    ("funding_amount", Field::FundingAmount),
    ("Market Share", Field::MarketShare),
    ("market_share", Field::MarketShare),
    ("Profitable", Field::Profitable),
    ("profitable", Field::Profitable),
    ("Year Founded", Field::YearFounded),
    ("year_founded", Field::YearFounded),
    ("Valuation", Field::Valuation),
    ("valuation", Field::Valuation),
    ("Industry", Field::Industry),
    ("industry", Field::Industry),
    ("Region", Field::Region),
    ("region", Field::Region),
    ("Exit Status", Field::ExitStatus),
    ("exit_status", Field::ExitStatus),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetLayout {
    Preprocessed,
    Raw,
}

impl DatasetLayout {
    pub fn detect(headers: &[String]) -> Self {
        if headers.iter().any(|h| h == PREPROCESSED_MARKER) {
            DatasetLayout::Preprocessed
        } else {
            DatasetLayout::Raw
        }
    }

    /// Factor converting the layout's monetary unit into millions of USD.
    fn to_millions(self) -> f64 {
        match self {
            DatasetLayout::Preprocessed => 1.0,
            DatasetLayout::Raw => 1.0 / USD_PER_MILLION,
        }
    }
}

impl fmt::Display for DatasetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLayout::Preprocessed => write!(f, "preprocessed"),
            DatasetLayout::Raw => write!(f, "raw"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub layout: DatasetLayout,
    pub records: Vec<CanonicalRecord>,
    pub rows_read: usize,
    /// Rows that could not be decoded at all.
    pub rows_skipped: usize,
    /// Rows dropped because their valuation was not positive.
    pub rows_dropped: usize,
}

impl CleanedDataset {
    pub fn industries(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            let industry = record.profile.industry.as_str();
            if !seen.contains(&industry) {
                seen.push(industry);
            }
        }
        seen
    }
}

/// Load a dataset from disk and clean it.
pub fn clean_dataset(path: &Path) -> Result<CleanedDataset> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;

    let cleaned = clean_reader(reader)
        .with_context(|| format!("{}: unable to clean dataset", path.display()))?;

    info!(
        path = %path.display(),
        layout = %cleaned.layout,
        rows_read = cleaned.rows_read,
        rows_kept = cleaned.records.len(),
        rows_skipped = cleaned.rows_skipped,
        rows_dropped = cleaned.rows_dropped,
        "dataset cleaned"
    );

    Ok(cleaned)
}

pub fn clean_reader<R: io::Read>(mut reader: csv::Reader<R>) -> Result<CleanedDataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("unable to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let layout = DatasetLayout::detect(&headers);
    let columns = match layout {
        DatasetLayout::Preprocessed => ColumnMap::preprocessed(&headers),
        DatasetLayout::Raw => ColumnMap::raw(&headers),
    };
    debug!(%layout, columns = headers.len(), "detected dataset layout");

    let mut records = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_skipped = 0usize;
    let mut rows_dropped = 0usize;

    for (row_idx, record) in reader.records().enumerate() {
        rows_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(row = row_idx + 2, error = %err, "skipping unreadable row");
                rows_skipped += 1;
                continue;
            }
        };

        let row = columns.extract(&record, layout);
        if !(row.valuation.is_finite() && row.valuation > 0.0) {
            rows_dropped += 1;
            continue;
        }
        records.push(row);
    }

    Ok(CleanedDataset {
        layout,
        records,
        rows_read,
        rows_skipped,
        rows_dropped,
    })
}

#[derive(Debug, Clone, Default)]
enum CategorySource {
    Column(usize),
    Indicators(Vec<(usize, String)>),
    #[default]
    Absent,
}

impl CategorySource {
    fn resolve(&self, record: &StringRecord) -> Option<String> {
        match self {
            CategorySource::Column(idx) => record
                .get(*idx)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            CategorySource::Indicators(indicators) => indicators
                .iter()
                .find(|(idx, _)| record.get(*idx).map(parse_flag).unwrap_or(false))
                .map(|(_, value)| value.clone()),
            CategorySource::Absent => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ColumnMap {
    revenue: Option<usize>,
    team_size: Option<usize>,
    funding_rounds: Option<usize>,
    funding_amount: Option<usize>,
    market_share: Option<usize>,
    profitable: Option<usize>,
    year_founded: Option<usize>,
    valuation: Option<usize>,
    industry: CategorySource,
    region: CategorySource,
    exit_status: CategorySource,
}

impl ColumnMap {
    fn preprocessed(headers: &[String]) -> Self {
        let mut map = Self::from_aliases(headers, PREPROCESSED_COLUMNS);
        map.industry = indicator_source(headers, CategoryField::Industry);
        map.region = indicator_source(headers, CategoryField::Region);
        map.exit_status = indicator_source(headers, CategoryField::ExitStatus);
        map
    }

    fn raw(headers: &[String]) -> Self {
        Self::from_aliases(headers, RAW_ALIASES)
    }

    fn from_aliases(headers: &[String], aliases: &[(&str, Field)]) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            let Some((_, field)) = aliases.iter().find(|(alias, _)| alias == header) else {
                continue;
            };
            map.assign(*field, idx);
        }
        map
    }

    /// First matching header wins.
    fn assign(&mut self, field: Field, idx: usize) {
        let slot = match field {
            Field::Revenue => &mut self.revenue,
            Field::TeamSize => &mut self.team_size,
            Field::FundingRounds => &mut self.funding_rounds,
            Field::FundingAmount => &mut self.funding_amount,
            Field::MarketShare => &mut self.market_share,
            Field::Profitable => &mut self.profitable,
            Field::YearFounded => &mut self.year_founded,
            Field::Valuation => &mut self.valuation,
            Field::Industry | Field::Region | Field::ExitStatus => {
                let source = match field {
                    Field::Industry => &mut self.industry,
                    Field::Region => &mut self.region,
                    _ => &mut self.exit_status,
                };
                if matches!(source, CategorySource::Absent) {
                    *source = CategorySource::Column(idx);
                }
                return;
            }
        };
        slot.get_or_insert(idx);
    }

    fn extract(&self, record: &StringRecord, layout: DatasetLayout) -> CanonicalRecord {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
        let money = |idx: Option<usize>, default: f64| {
            cell(idx)
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_currency(raw) * layout.to_millions())
                .unwrap_or(default)
        };
        let number = |idx: Option<usize>| cell(idx).and_then(parse_number);

        let profile = CompanyProfile {
            revenue: money(self.revenue, DEFAULT_REVENUE),
            team_size: number(self.team_size)
                .map(|n| n.round().max(1.0) as u32)
                .unwrap_or(DEFAULT_TEAM_SIZE),
            industry: self
                .industry
                .resolve(record)
                .unwrap_or_else(|| OTHER_INDUSTRY.to_string()),
            funding_rounds: number(self.funding_rounds)
                .map(|n| n.round().max(0.0) as u32)
                .unwrap_or(DEFAULT_FUNDING_ROUNDS),
            funding_amount: money(self.funding_amount, DEFAULT_FUNDING_AMOUNT),
            market_share: number(self.market_share).unwrap_or(DEFAULT_MARKET_SHARE),
            profitable: cell(self.profitable).map(parse_flag).unwrap_or(false),
            year_founded: number(self.year_founded)
                .map(|n| n.round() as i32)
                .unwrap_or(DEFAULT_YEAR_FOUNDED),
            region: self.region.resolve(record),
            exit_status: self.exit_status.resolve(record),
        };

        CanonicalRecord {
            profile,
            valuation: money(self.valuation, 0.0),
        }
    }
}

fn indicator_source(headers: &[String], field: CategoryField) -> CategorySource {
    let indicators: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            field
                .value_of_indicator(header)
                .map(|value| (idx, value.to_string()))
        })
        .collect();

    if indicators.is_empty() {
        CategorySource::Absent
    } else {
        CategorySource::Indicators(indicators)
    }
}

/// Parse strings like `$1,250`, `3.5M` or `2b` into a plain amount.
///
/// Unparsable input yields 0.
pub fn parse_currency(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(*c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let (digits, multiplier) = match cleaned.chars().last() {
        Some('K') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => value * multiplier,
        _ => 0.0,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_flag(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("yes") {
        return true;
    }
    parse_number(trimmed).map(|n| n != 0.0).unwrap_or(false)
}
