#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Canonical crash record types and the severity/direction taxonomy.
//!
//! This crate defines the record shape every crash table is normalized
//! into, and the classification enums shared across the resolution
//! pipeline. Source-specific severity and direction spellings are mapped
//! into these shared types; unrecognized text is preserved as `Unknown`
//! with the raw string retained for diagnostics, never silently defaulted
//! to a real category.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Crash severity classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Property damage only, no injuries
    PropertyDamage,
    /// At least one injury (includes records marked "Both")
    Injury,
    /// At least one fatality
    Fatality,
    /// Severity text present but not recognized
    Unknown,
}

impl Severity {
    /// Classifies free-form severity text (case-insensitive, trimmed).
    ///
    /// Recognizes both the spelled-out forms used in the Segment 5
    /// accident history exports ("Property Damage", "Injury", "Both",
    /// "Fatality") and the pre-mapped short codes ("PDO", "INJ", "FAT").
    /// Anything else classifies as [`Self::Unknown`]; callers should
    /// retain the raw text alongside.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "property damage" | "property damage only" | "pdo" => Self::PropertyDamage,
            "injury" | "inj" | "both" => Self::Injury,
            "fatality" | "fatal" | "fat" => Self::Fatality,
            _ => Self::Unknown,
        }
    }

    /// Weight used for density (heatmap) rendering.
    #[must_use]
    pub const fn heat_weight(self) -> u32 {
        match self {
            Self::Fatality => 3,
            Self::Injury => 2,
            Self::PropertyDamage | Self::Unknown => 1,
        }
    }

    /// Marker color used by the rendering layer for severity maps.
    #[must_use]
    pub const fn marker_color(self) -> &'static str {
        match self {
            Self::PropertyDamage => "green",
            Self::Injury => "orange",
            Self::Fatality => "red",
            Self::Unknown => "gray",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PropertyDamage,
            Self::Injury,
            Self::Fatality,
            Self::Unknown,
        ]
    }
}

/// Travel direction of the primary vehicle, as a compass heading.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
    /// Direction text missing or not recognized
    Unknown,
}

impl Direction {
    /// Classifies free-form direction text (trimmed, uppercased).
    ///
    /// Accepts compass tokens ("N", "NE", ...), the bound forms used in
    /// crash tables ("NB", "SB", "EB", "WB"), and spelled-out headings
    /// ("NORTHBOUND", "NORTH"). Anything else classifies as
    /// [`Self::Unknown`]; callers should retain the raw text alongside.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "N" | "NB" | "NORTH" | "NORTHBOUND" => Self::N,
            "NE" => Self::Ne,
            "E" | "EB" | "EAST" | "EASTBOUND" => Self::E,
            "SE" => Self::Se,
            "S" | "SB" | "SOUTH" | "SOUTHBOUND" => Self::S,
            "SW" => Self::Sw,
            "W" | "WB" | "WEST" | "WESTBOUND" => Self::W,
            "NW" => Self::Nw,
            _ => Self::Unknown,
        }
    }

    /// Returns the compass-bucket group this direction belongs to.
    ///
    /// North-tending and south-tending groups drive the directional
    /// sub-maps; everything else lands in [`DirectionBucket::Other`],
    /// which appears in neither sub-map.
    #[must_use]
    pub const fn bucket(self) -> DirectionBucket {
        match self {
            Self::N | Self::Ne | Self::Nw => DirectionBucket::NorthTending,
            Self::S | Self::Se | Self::Sw => DirectionBucket::SouthTending,
            Self::E | Self::W | Self::Unknown => DirectionBucket::Other,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::N,
            Self::Ne,
            Self::E,
            Self::Se,
            Self::S,
            Self::Sw,
            Self::W,
            Self::Nw,
            Self::Unknown,
        ]
    }
}

/// Compass-bucket grouping for directional sub-maps.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionBucket {
    /// N, NE, NW (and NB-style bound forms)
    NorthTending,
    /// S, SE, SW (and SB-style bound forms)
    SouthTending,
    /// E, W, and unrecognized directions; excluded from both sub-maps
    Other,
}

/// Which lookup tier produced a resolved coordinate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchKind {
    /// Reference point with ref_value exactly equal to the offset
    Exact,
    /// Matched after rounding both sides to the nearest whole milepost
    RoundedInteger,
    /// Closest reference point by absolute milepost difference
    Nearest,
    /// Interpolated between two fixed anchor points
    Interpolated,
    /// No lookup tier produced a coordinate
    Unresolved,
}

impl MatchKind {
    /// `true` for every variant that carries a coordinate.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Exact,
            Self::RoundedInteger,
            Self::Nearest,
            Self::Interpolated,
            Self::Unresolved,
        ]
    }
}

/// A WGS84 geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in decimal degrees, range [-90, 90].
    pub lat: f64,
    /// Longitude in decimal degrees, range [-180, 180].
    pub lon: f64,
}

impl LatLon {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `true` when both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A crash record normalized into the canonical shape.
///
/// `route_offset` is the linear-referencing position (milepost) along
/// the route; the normalizer guarantees it is finite and non-negative.
/// Raw severity/direction strings are retained for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRecord {
    /// When the crash occurred, if the source row carried a date.
    pub date: Option<NaiveDateTime>,
    /// Milepost along the route.
    pub route_offset: f64,
    /// Classified severity.
    pub severity: Severity,
    /// Classified travel direction.
    pub direction: Direction,
    /// Original severity cell text, before classification.
    pub raw_severity_text: String,
    /// Original direction cell text, before classification.
    pub raw_direction_text: String,
}

impl CrashRecord {
    /// Direction bucket for sub-map grouping.
    #[must_use]
    pub const fn direction_bucket(&self) -> DirectionBucket {
        self.direction.bucket()
    }
}

/// A crash record with its resolved coordinate attached.
///
/// Invariant: `coordinate` is `Some` exactly when
/// `match_kind.is_resolved()`. Unresolved records carry no coordinate
/// and must be excluded from spatial output rather than placed at a
/// placeholder location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCrash {
    /// The normalized input record.
    #[serde(flatten)]
    pub record: CrashRecord,
    /// Resolved WGS84 coordinate, absent when unresolved.
    pub coordinate: Option<LatLon>,
    /// Which lookup tier produced the coordinate.
    pub match_kind: MatchKind,
}

impl ResolvedCrash {
    /// Weight for density rendering, derived from severity.
    #[must_use]
    pub const fn heat_weight(&self) -> u32 {
        self.record.severity.heat_weight()
    }
}
