//! Row normalization into canonical crash records.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use crash_map_crash_models::{CrashRecord, Direction, Severity};
use serde::Serialize;

use crate::{IngestError, RawTable};

/// Column indexes detected for each record role.
///
/// Detection matches header names case-insensitively against role
/// substrings; the leftmost matching column wins, so detection is
/// deterministic for any header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Crash date column (name contains "date").
    pub date: usize,
    /// Travel direction column (name contains "dir").
    pub direction: usize,
    /// Linear-reference offset column (name contains "mile", "ref", or
    /// "post").
    pub offset: usize,
    /// Severity/damage description column (name contains "sever",
    /// "damage", or "injur").
    pub severity: usize,
}

impl ColumnRoles {
    /// Detects all four column roles from a header row.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Schema`] naming the first role with no
    /// matching column.
    pub fn detect(headers: &[String]) -> Result<Self, IngestError> {
        let find = |substrings: &[&str], role: &str| {
            headers
                .iter()
                .position(|header| {
                    let lower = header.to_lowercase();
                    substrings.iter().any(|s| lower.contains(s))
                })
                .ok_or_else(|| IngestError::Schema {
                    missing: role.to_string(),
                })
        };

        Ok(Self {
            date: find(&["date"], "date")?,
            direction: find(&["dir"], "direction")?,
            offset: find(&["mile", "ref", "post"], "route offset")?,
            severity: find(&["sever", "damage", "injur"], "severity")?,
        })
    }
}

/// Why a row was excluded during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionReason {
    /// Offset cell empty or missing.
    MissingOffset,
    /// Offset cell present but not a number.
    NonNumericOffset,
    /// Offset parsed but is NaN or infinite.
    NonFiniteOffset,
    /// Offset parsed but is negative.
    NegativeOffset,
    /// Date cell empty or missing.
    MissingDate,
    /// Date cell present but no known format matched.
    UnparseableDate,
    /// Severity cell empty or missing.
    MissingSeverity,
}

/// Counts of what went in, what came out, and what was excluded why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationSummary {
    /// Data rows seen.
    pub rows_in: usize,
    /// Canonical records produced.
    pub records_out: usize,
    /// Excluded-row counts keyed by reason.
    pub excluded: BTreeMap<ExclusionReason, usize>,
}

impl NormalizationSummary {
    /// Total rows excluded across all reasons.
    #[must_use]
    pub fn total_excluded(&self) -> usize {
        self.excluded.values().sum()
    }

    fn exclude(&mut self, reason: ExclusionReason) {
        *self.excluded.entry(reason).or_insert(0) += 1;
    }
}

/// Canonical records plus the normalization summary.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCrashes {
    /// Records that survived normalization.
    pub records: Vec<CrashRecord>,
    /// Counts for the caller to surface; exclusions are never silent.
    pub summary: NormalizationSummary,
}

/// Normalizes a raw crash table into canonical records.
///
/// Rows with a missing/non-numeric/non-finite/negative offset, a
/// missing or unparseable date, or a missing severity cell are excluded
/// and counted. Unrecognized severity or direction *text* is kept as
/// `Unknown` with the raw string retained; guessing a real category for
/// it is exactly the bug this pipeline exists to avoid.
///
/// # Errors
///
/// Returns [`IngestError::Schema`] when a column role cannot be
/// detected from the headers.
pub fn normalize(table: &RawTable) -> Result<NormalizedCrashes, IngestError> {
    let roles = ColumnRoles::detect(&table.headers)?;

    let mut records = Vec::new();
    let mut summary = NormalizationSummary::default();

    for row in &table.rows {
        summary.rows_in += 1;
        let cell = |idx: usize| row.get(idx).map_or("", String::as_str).trim();

        let offset_text = cell(roles.offset);
        if offset_text.is_empty() {
            summary.exclude(ExclusionReason::MissingOffset);
            continue;
        }
        let Ok(route_offset) = offset_text.parse::<f64>() else {
            summary.exclude(ExclusionReason::NonNumericOffset);
            continue;
        };
        if !route_offset.is_finite() {
            summary.exclude(ExclusionReason::NonFiniteOffset);
            continue;
        }
        if route_offset < 0.0 {
            summary.exclude(ExclusionReason::NegativeOffset);
            continue;
        }

        let date_text = cell(roles.date);
        if date_text.is_empty() {
            summary.exclude(ExclusionReason::MissingDate);
            continue;
        }
        let Some(date) = parse_date(date_text) else {
            summary.exclude(ExclusionReason::UnparseableDate);
            continue;
        };

        let severity_text = cell(roles.severity);
        if severity_text.is_empty() {
            summary.exclude(ExclusionReason::MissingSeverity);
            continue;
        }

        let direction_text = cell(roles.direction);

        records.push(CrashRecord {
            date: Some(date),
            route_offset,
            severity: Severity::from_text(severity_text),
            direction: Direction::from_text(direction_text),
            raw_severity_text: severity_text.to_string(),
            raw_direction_text: direction_text.to_string(),
        });
    }

    summary.records_out = records.len();
    log::info!(
        "Normalized {} of {} rows ({} excluded)",
        summary.records_out,
        summary.rows_in,
        summary.total_excluded()
    );

    Ok(NormalizedCrashes { records, summary })
}

/// Date-and-time formats tried first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only formats; the time component defaults to midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Parses a crash date, trying each known export format in order.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}
