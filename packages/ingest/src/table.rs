//! Raw tabular input, independent of the on-disk format.

use std::io::Read;

use crate::IngestError;

/// A crash table as headers plus string rows, before role detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Header row, as written in the source.
    pub headers: Vec<String>,
    /// Data rows; ragged rows are permitted and padded on access.
    pub rows: Vec<Vec<String>>,
}

/// Loads a crash table from CSV.
///
/// Some accident-history exports lead with a single-cell title banner
/// ("I-25 Segment 5 Accident History") above the real header row; when
/// the first row has exactly one non-empty cell and a multi-column row
/// follows, the banner is skipped.
///
/// # Errors
///
/// * [`IngestError::Csv`] when the input is not parseable CSV.
/// * [`IngestError::Schema`] when no header row can be found.
pub fn load_csv(reader: impl Read) -> Result<RawTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if is_title_banner(&rows) {
        log::debug!("Skipping title banner row: {:?}", rows[0].first());
        rows.remove(0);
    }

    if rows.is_empty() {
        return Err(IngestError::Schema {
            missing: "a header row (table is empty)".to_string(),
        });
    }

    let headers = rows.remove(0);
    Ok(RawTable { headers, rows })
}

/// `true` when the first row is a single-cell banner above a
/// multi-column header row.
fn is_title_banner(rows: &[Vec<String>]) -> bool {
    let Some((first, rest)) = rows.split_first() else {
        return false;
    };
    let Some(next) = rest.first() else {
        return false;
    };
    non_empty_cells(first) == 1 && non_empty_cells(next) >= 2
}

fn non_empty_cells(row: &[String]) -> usize {
    row.iter().filter(|cell| !cell.trim().is_empty()).count()
}
