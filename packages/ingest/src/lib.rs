#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crash table normalization.
//!
//! Crash data arrives as free-form tables: column names vary between
//! exports ("Mile Post" vs "Milepost", "Direction" vs "Veh1 Dir",
//! "Severity" vs "Injury/Property Damage"), severity text mixes
//! spelled-out categories with short codes, and some exports lead with a
//! title banner row. This crate detects column roles by a documented
//! substring heuristic and normalizes rows into canonical
//! [`CrashRecord`]s, counting every excluded row by reason so nothing is
//! silently dropped.
//!
//! [`CrashRecord`]: crash_map_crash_models::CrashRecord

pub mod normalize;
pub mod table;

pub use normalize::{
    ColumnRoles, ExclusionReason, NormalizationSummary, NormalizedCrashes, normalize, parse_date,
};
pub use table::{RawTable, load_csv};

use thiserror::Error;

/// Errors from crash table parsing and normalization.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A required column role could not be identified in the header row.
    #[error("Schema error: no column identifiable as {missing}")]
    Schema {
        /// The role that could not be matched.
        missing: String,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Reading the crash table failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
