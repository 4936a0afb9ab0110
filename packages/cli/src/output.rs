//! Resolved-table writers for the rendering layer.
//!
//! Unresolved records are written with empty coordinate fields (CSV) or
//! a null coordinate (JSON) so consumers can exclude them from spatial
//! output; they are never placed at a placeholder location.

use std::io::Write;

use crash_map_crash_models::ResolvedCrash;
use crash_map_ingest::NormalizationSummary;
use crash_map_resolver::ResolutionSummary;
use serde::Serialize;

/// Everything one resolution pass produced, for JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTable<'a> {
    /// One row per normalized input record.
    pub records: &'a [ResolvedCrash],
    /// What normalization kept and excluded.
    pub normalization: &'a NormalizationSummary,
    /// Which lookup tiers answered.
    pub resolution: &'a ResolutionSummary,
}

/// CSV header, aligned with what the rendering layer consumes.
const CSV_HEADERS: &[&str] = &[
    "date",
    "severity",
    "raw_severity",
    "direction",
    "direction_bucket",
    "mile_post",
    "latitude",
    "longitude",
    "match_kind",
    "heat_weight",
];

/// Writes the resolved table as CSV.
///
/// # Errors
///
/// Returns a [`csv::Error`] when writing fails.
pub fn write_csv(writer: impl Write, records: &[ResolvedCrash]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADERS)?;

    for resolved in records {
        let record = &resolved.record;
        let (latitude, longitude) = resolved.coordinate.map_or_else(
            || (String::new(), String::new()),
            |coordinate| (coordinate.lat.to_string(), coordinate.lon.to_string()),
        );
        csv_writer.write_record(&[
            record
                .date
                .map_or_else(String::new, |date| date.format("%Y-%m-%d %H:%M:%S").to_string()),
            record.severity.to_string(),
            record.raw_severity_text.clone(),
            record.direction.to_string(),
            record.direction_bucket().to_string(),
            record.route_offset.to_string(),
            latitude,
            longitude,
            resolved.match_kind.to_string(),
            resolved.heat_weight().to_string(),
        ])?;
    }

    csv_writer.flush().map_err(Into::into)
}

/// Writes the resolved table (records plus summaries) as pretty JSON.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] when serialization fails.
pub fn write_json(writer: impl Write, table: &ResolvedTable<'_>) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(writer, table)
}
