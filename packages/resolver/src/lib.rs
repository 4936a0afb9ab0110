#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The milepost resolver: attaches coordinates to crash records.
//!
//! [`resolve`] is a pure function over its inputs; it does no I/O and
//! identical inputs always produce identical output. A record the model
//! cannot place is a normal terminal state, surfaced as
//! [`MatchKind::Unresolved`] with no coordinate and counted in the
//! summary; it is never an error, and never a placeholder coordinate.
//! The only error condition is a structurally invalid offset reaching
//! the resolver, which the normalizer is contracted to prevent.

use crash_map_crash_models::{CrashRecord, MatchKind, ResolvedCrash};
use crash_map_reference::MilepostModel;
use serde::Serialize;
use thiserror::Error;

/// Errors from the resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A record carried a non-finite or negative route offset, which
    /// normalization is supposed to have excluded.
    #[error("invalid route offset {value} in record {index}: offsets must be finite and non-negative")]
    InvalidOffset {
        /// Index of the offending record in the input sequence.
        index: usize,
        /// The offending offset value.
        value: f64,
    },
}

/// Per-tier counts for one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionSummary {
    /// Records submitted.
    pub records_in: usize,
    /// Exact ref_value matches.
    pub exact: usize,
    /// Rounded-to-whole-milepost matches.
    pub rounded_integer: usize,
    /// Nearest-by-absolute-difference matches.
    pub nearest: usize,
    /// Anchor-model interpolations.
    pub interpolated: usize,
    /// Records no tier could place.
    pub unresolved: usize,
}

impl ResolutionSummary {
    /// Records that received a coordinate.
    #[must_use]
    pub const fn resolved_total(&self) -> usize {
        self.exact + self.rounded_integer + self.nearest + self.interpolated
    }

    const fn count(&mut self, kind: MatchKind) {
        match kind {
            MatchKind::Exact => self.exact += 1,
            MatchKind::RoundedInteger => self.rounded_integer += 1,
            MatchKind::Nearest => self.nearest += 1,
            MatchKind::Interpolated => self.interpolated += 1,
            MatchKind::Unresolved => self.unresolved += 1,
        }
    }
}

/// Resolved records plus the pass summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionOutcome {
    /// One output row per input record, in input order.
    pub resolved: Vec<ResolvedCrash>,
    /// Per-tier counts for the caller to surface.
    pub summary: ResolutionSummary,
}

/// Resolves every record's route offset to a coordinate via the model.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidOffset`] naming the first record with
/// a non-finite or negative offset. Per-record lookup failure is not an
/// error; it is [`MatchKind::Unresolved`] in the output.
pub fn resolve(
    records: &[CrashRecord],
    model: &impl MilepostModel,
) -> Result<ResolutionOutcome, ResolveError> {
    let mut resolved = Vec::with_capacity(records.len());
    let mut summary = ResolutionSummary {
        records_in: records.len(),
        ..ResolutionSummary::default()
    };

    for (index, record) in records.iter().enumerate() {
        if !record.route_offset.is_finite() || record.route_offset < 0.0 {
            return Err(ResolveError::InvalidOffset {
                index,
                value: record.route_offset,
            });
        }

        let resolution = model.query(record.route_offset);
        let match_kind = resolution.match_kind();
        summary.count(match_kind);

        resolved.push(ResolvedCrash {
            record: record.clone(),
            coordinate: resolution.coordinate(),
            match_kind,
        });
    }

    if summary.unresolved > 0 {
        log::warn!(
            "{} of {} records could not be resolved to a coordinate",
            summary.unresolved,
            summary.records_in
        );
    }
    log::info!(
        "Resolved {} of {} records",
        summary.resolved_total(),
        summary.records_in
    );

    Ok(ResolutionOutcome { resolved, summary })
}
