#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route reference layer indexing and milepost-to-coordinate models.
//!
//! Two ways to turn a linear-referencing offset (milepost along a named
//! route) into a WGS84 coordinate:
//!
//! - [`RouteReferenceIndex`]: built from an uploaded reference layer of
//!   point features tagged with route id, optional state id, and a
//!   numeric reference value. Queries cascade through exact, rounded-
//!   integer, and nearest-by-absolute-difference tiers with a
//!   deterministic first-inserted tie-break.
//! - [`LinearAnchorModel`]: two fixed anchor points define a line;
//!   queries interpolate (and extrapolate) linearly and always succeed.
//!
//! Both implement [`MilepostModel`], the seam the resolver is generic
//! over. The index is immutable once built and safe for concurrent
//! reads; it lives for one resolution pass and is rebuilt per upload.

pub mod anchor;
pub mod index;
pub mod layer;

pub use anchor::LinearAnchorModel;
pub use index::{AttributeRoles, RawReferenceFeature, ReferencePoint, RouteReferenceIndex};
pub use layer::load_geojson;

use crash_map_crash_models::{LatLon, MatchKind};
use thiserror::Error;

/// Errors from building reference models or loading reference layers.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// Required attributes could not be identified, or the layer uses an
    /// unsupported coordinate reference system.
    #[error("Schema error: {message}")]
    Schema {
        /// Description of what could not be identified.
        message: String,
    },

    /// Route/state filtering left zero candidate reference points.
    #[error(
        "Empty reference set: no reference points match route={route:?} state={state:?}"
    )]
    EmptyReferenceSet {
        /// Route filter in effect, if any.
        route: Option<String>,
        /// State filter in effect, if any.
        state: Option<String>,
    },

    /// Anchor model start and end offsets coincide.
    #[error("Degenerate anchor model: start and end offsets are both {offset}")]
    DegenerateAnchor {
        /// The shared offset value.
        offset: f64,
    },

    /// Reference layer is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Json(#[from] geojson::Error),

    /// Reading the reference layer failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a single milepost query against a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A coordinate was produced by the named lookup tier.
    Resolved {
        /// The resolved WGS84 coordinate.
        coordinate: LatLon,
        /// Which tier produced it.
        match_kind: MatchKind,
    },
    /// No lookup tier produced a coordinate.
    Unresolved,
}

impl Resolution {
    /// The coordinate, if resolved.
    #[must_use]
    pub const fn coordinate(self) -> Option<LatLon> {
        match self {
            Self::Resolved { coordinate, .. } => Some(coordinate),
            Self::Unresolved => None,
        }
    }

    /// The match kind; [`MatchKind::Unresolved`] when no tier matched.
    #[must_use]
    pub const fn match_kind(self) -> MatchKind {
        match self {
            Self::Resolved { match_kind, .. } => match_kind,
            Self::Unresolved => MatchKind::Unresolved,
        }
    }
}

/// A model that resolves a route-relative offset to a coordinate.
///
/// Implementations must be pure: the same offset against the same model
/// always yields the same [`Resolution`].
pub trait MilepostModel {
    /// Resolves a milepost offset to a coordinate.
    fn query(&self, offset: f64) -> Resolution;
}

/// Normalizes a route/state identifier for comparison: trimmed and
/// uppercased. Applied symmetrically to layer attributes and filters.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_identifiers_symmetrically() {
        assert_eq!(normalize_identifier(" i 25 "), "I 25");
        assert_eq!(normalize_identifier("Co"), "CO");
        assert_eq!(normalize_identifier("I 25"), normalize_identifier("i 25"));
    }

    #[test]
    fn unresolved_has_no_coordinate() {
        assert_eq!(Resolution::Unresolved.coordinate(), None);
        assert_eq!(Resolution::Unresolved.match_kind(), MatchKind::Unresolved);
    }
}
