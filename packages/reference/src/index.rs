//! Queryable index over a route reference layer.
//!
//! Built once per uploaded layer: features are filtered to the target
//! route/state, invalid features are skipped with a count, and the
//! surviving points are indexed for exact, rounded-integer, and
//! nearest-by-absolute-difference lookups. All tie-breaks prefer the
//! first-inserted point, so results never depend on processing order.

use std::collections::{BTreeMap, BTreeSet};

use crash_map_crash_models::{LatLon, MatchKind};
use serde_json::Value;

use crate::{MilepostModel, ReferenceError, Resolution, normalize_identifier};

/// A reference-layer point feature before role detection, as parsed from
/// the uploaded layer (or constructed directly in tests).
#[derive(Debug, Clone)]
pub struct RawReferenceFeature {
    /// Attribute name -> value, as carried by the source feature.
    pub properties: serde_json::Map<String, Value>,
    /// Feature geometry, already normalized to WGS84.
    pub point: LatLon,
}

/// One reference point after role detection and filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePoint {
    /// Normalized route identifier (trimmed, uppercased).
    pub route_id: String,
    /// Normalized state identifier, when the layer carries one.
    pub state_id: Option<String>,
    /// Milepost / reference-point value along the route.
    pub ref_value: f64,
    /// WGS84 coordinate of the reference post.
    pub coordinate: LatLon,
}

/// Attribute names detected for each role in a reference layer.
///
/// Detection is a documented heuristic, not guessing: attribute names
/// are matched case-insensitively against role substrings, scanning
/// keys in sorted order so the outcome is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRoles {
    /// Attribute holding the route identifier (name contains "route").
    pub route: String,
    /// Attribute holding the state identifier (name contains "state").
    pub state: Option<String>,
    /// Attribute holding the reference value (name contains "mile" or
    /// "ref").
    pub ref_value: String,
}

impl AttributeRoles {
    /// Detects attribute roles across all feature property names.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Schema`] when no attribute can be
    /// identified as the route id or the reference value.
    pub fn detect<'a>(
        features: impl IntoIterator<Item = &'a RawReferenceFeature>,
    ) -> Result<Self, ReferenceError> {
        let keys: BTreeSet<&str> = features
            .into_iter()
            .flat_map(|f| f.properties.keys().map(String::as_str))
            .collect();

        let find = |substrings: &[&str]| {
            keys.iter()
                .find(|key| {
                    let lower = key.to_lowercase();
                    substrings.iter().any(|s| lower.contains(s))
                })
                .map(|key| (*key).to_string())
        };

        let route = find(&["route"]).ok_or_else(|| ReferenceError::Schema {
            message: "no attribute identifiable as route id (name containing \"route\")"
                .to_string(),
        })?;
        let ref_value = find(&["mile", "ref"]).ok_or_else(|| ReferenceError::Schema {
            message:
                "no attribute identifiable as reference value (name containing \"mile\" or \"ref\")"
                    .to_string(),
        })?;
        let state = find(&["state"]);

        Ok(Self {
            route,
            state,
            ref_value,
        })
    }
}

/// Queryable index over the reference points of one route.
///
/// Owns the filtered reference set for the lifetime of one resolution
/// pass. Immutable after build; safe for concurrent reads.
#[derive(Debug)]
pub struct RouteReferenceIndex {
    /// Reference points in insertion (layer) order.
    points: Vec<ReferencePoint>,
    /// (ref_value, insertion index), sorted by value then index.
    sorted: Vec<(f64, usize)>,
    /// Rounded ref_value -> first-seen insertion index.
    rounded_first: BTreeMap<i64, usize>,
}

impl RouteReferenceIndex {
    /// Builds an index from raw layer features, filtered to a route and
    /// optionally a state. Filters compare normalized (trimmed,
    /// uppercased) identifiers for exact equality.
    ///
    /// Features with missing/non-numeric reference values or coordinates
    /// outside WGS84 bounds are skipped and counted, never indexed.
    ///
    /// # Errors
    ///
    /// * [`ReferenceError::Schema`] when attribute roles cannot be
    ///   detected, or a state filter is given but the layer has no state
    ///   attribute.
    /// * [`ReferenceError::EmptyReferenceSet`] when filtering leaves
    ///   zero candidate points.
    pub fn build(
        features: &[RawReferenceFeature],
        route_filter: Option<&str>,
        state_filter: Option<&str>,
    ) -> Result<Self, ReferenceError> {
        let roles = AttributeRoles::detect(features)?;

        if state_filter.is_some() && roles.state.is_none() {
            return Err(ReferenceError::Schema {
                message: "state filter given but no attribute identifiable as state id"
                    .to_string(),
            });
        }

        let route_filter = route_filter.map(normalize_identifier);
        let state_filter = state_filter.map(normalize_identifier);

        let mut points = Vec::new();
        let mut skipped = 0_usize;

        for feature in features {
            let Some(route_id) = feature
                .properties
                .get(&roles.route)
                .and_then(value_as_string)
                .map(|s| normalize_identifier(&s))
            else {
                skipped += 1;
                continue;
            };
            let Some(ref_value) = feature
                .properties
                .get(&roles.ref_value)
                .and_then(value_as_f64)
                .filter(|v| v.is_finite())
            else {
                skipped += 1;
                continue;
            };
            if !feature.point.is_valid() {
                skipped += 1;
                continue;
            }

            let state_id = roles
                .state
                .as_ref()
                .and_then(|key| feature.properties.get(key))
                .and_then(value_as_string)
                .map(|s| normalize_identifier(&s));

            if let Some(filter) = &route_filter {
                if route_id != *filter {
                    continue;
                }
            }
            if let Some(filter) = &state_filter {
                if state_id.as_deref() != Some(filter.as_str()) {
                    continue;
                }
            }

            points.push(ReferencePoint {
                route_id,
                state_id,
                ref_value,
                coordinate: feature.point,
            });
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} reference features with missing or invalid attributes");
        }

        if points.is_empty() {
            return Err(ReferenceError::EmptyReferenceSet {
                route: route_filter,
                state: state_filter,
            });
        }

        let mut sorted: Vec<(f64, usize)> = points
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.ref_value, idx))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut rounded_first = BTreeMap::new();
        for (idx, point) in points.iter().enumerate() {
            rounded_first.entry(round_key(point.ref_value)).or_insert(idx);
        }

        log::info!(
            "Indexed {} reference points (route={:?}, state={:?})",
            points.len(),
            route_filter,
            state_filter
        );

        Ok(Self {
            points,
            sorted,
            rounded_first,
        })
    }

    /// Number of indexed reference points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` when the index holds no reference points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resolves an offset to a reference point and the tier that matched.
    ///
    /// Tiers in order of preference: exact ref_value equality, match on
    /// both sides rounded to the nearest whole milepost (first-seen point
    /// per rounded key), then nearest by absolute difference with ties
    /// broken toward the first-inserted point.
    #[must_use]
    pub fn query_match(&self, offset: f64) -> Option<(&ReferencePoint, MatchKind)> {
        if self.points.is_empty() || !offset.is_finite() {
            return None;
        }

        if let Some(idx) = self.exact(offset) {
            return Some((&self.points[idx], MatchKind::Exact));
        }
        if let Some(&idx) = self.rounded_first.get(&round_key(offset)) {
            return Some((&self.points[idx], MatchKind::RoundedInteger));
        }
        self.nearest(offset)
            .map(|idx| (&self.points[idx], MatchKind::Nearest))
    }

    /// First-inserted point whose ref_value equals the offset exactly.
    fn exact(&self, offset: f64) -> Option<usize> {
        let at = self.sorted.partition_point(|&(value, _)| value < offset);
        match self.sorted.get(at) {
            Some(&(value, idx)) if value == offset => Some(idx),
            _ => None,
        }
    }

    /// Point minimizing `|ref_value - offset|`. Among equidistant
    /// candidates the lowest insertion index wins; within a run of equal
    /// ref_values the run's first entry already carries the lowest
    /// insertion index because `sorted` orders by (value, index).
    fn nearest(&self, offset: f64) -> Option<usize> {
        let at = self.sorted.partition_point(|&(value, _)| value < offset);

        let above = self.sorted.get(at).copied();
        let below = at.checked_sub(1).map(|prev| {
            let run_value = self.sorted[prev].0;
            let run_start = self.sorted.partition_point(|&(value, _)| value < run_value);
            self.sorted[run_start]
        });

        match (below, above) {
            (None, None) => None,
            (Some((_, idx)), None) | (None, Some((_, idx))) => Some(idx),
            (Some((lo_value, lo_idx)), Some((hi_value, hi_idx))) => {
                let lo_dist = (offset - lo_value).abs();
                let hi_dist = (hi_value - offset).abs();
                if lo_dist < hi_dist {
                    Some(lo_idx)
                } else if hi_dist < lo_dist {
                    Some(hi_idx)
                } else {
                    Some(lo_idx.min(hi_idx))
                }
            }
        }
    }
}

impl MilepostModel for RouteReferenceIndex {
    fn query(&self, offset: f64) -> Resolution {
        self.query_match(offset)
            .map_or(Resolution::Unresolved, |(point, match_kind)| {
                Resolution::Resolved {
                    coordinate: point.coordinate,
                    match_kind,
                }
            })
    }
}

/// Rounds a ref_value to its whole-milepost key (half away from zero).
#[allow(clippy::cast_possible_truncation)]
fn round_key(value: f64) -> i64 {
    value.round() as i64
}

/// Extracts a string attribute; numeric attributes are stringified so
/// layers storing route numbers as numbers still match.
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extracts a numeric attribute; numeric strings are parsed.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(route: &str, state: Option<&str>, mile: f64, lat: f64, lon: f64) -> RawReferenceFeature {
        let mut properties = serde_json::Map::new();
        properties.insert("Route_Name".to_string(), json!(route));
        if let Some(state) = state {
            properties.insert("State_Code".to_string(), json!(state));
        }
        properties.insert("Mile_Point".to_string(), json!(mile));
        RawReferenceFeature {
            properties,
            point: LatLon::new(lat, lon),
        }
    }

    fn i25_segment() -> Vec<RawReferenceFeature> {
        vec![
            feature("I 25", Some("CO"), 243.0, 40.336, -104.993),
            feature("I 25", Some("CO"), 250.0, 40.185, -104.981),
        ]
    }

    #[test]
    fn detects_attribute_roles() {
        let features = i25_segment();
        let roles = AttributeRoles::detect(&features).unwrap();
        assert_eq!(roles.route, "Route_Name");
        assert_eq!(roles.state.as_deref(), Some("State_Code"));
        assert_eq!(roles.ref_value, "Mile_Point");
    }

    #[test]
    fn detects_ref_substring_attribute() {
        let mut properties = serde_json::Map::new();
        properties.insert("ROUTE".to_string(), json!("I 25"));
        properties.insert("RefPt".to_string(), json!(243.0));
        let features = vec![RawReferenceFeature {
            properties,
            point: LatLon::new(40.336, -104.993),
        }];
        let roles = AttributeRoles::detect(&features).unwrap();
        assert_eq!(roles.ref_value, "RefPt");
        assert_eq!(roles.state, None);
    }

    #[test]
    fn missing_route_attribute_is_schema_error() {
        let mut properties = serde_json::Map::new();
        properties.insert("Milepost".to_string(), json!(243.0));
        let features = vec![RawReferenceFeature {
            properties,
            point: LatLon::new(40.336, -104.993),
        }];
        let err = RouteReferenceIndex::build(&features, None, None).unwrap_err();
        assert!(matches!(err, ReferenceError::Schema { .. }));
    }

    #[test]
    fn exact_match_wins_first_tier() {
        let index = RouteReferenceIndex::build(&i25_segment(), Some("I 25"), None).unwrap();
        let (point, kind) = index.query_match(243.0).unwrap();
        assert_eq!(kind, MatchKind::Exact);
        assert!((point.coordinate.lat - 40.336).abs() < 1e-9);
    }

    #[test]
    fn exact_match_prefers_first_inserted_duplicate() {
        let features = vec![
            feature("I 25", None, 243.0, 40.336, -104.993),
            feature("I 25", None, 243.0, 40.999, -104.999),
        ];
        let index = RouteReferenceIndex::build(&features, None, None).unwrap();
        let (point, kind) = index.query_match(243.0).unwrap();
        assert_eq!(kind, MatchKind::Exact);
        assert!((point.coordinate.lat - 40.336).abs() < 1e-9);
    }

    #[test]
    fn rounded_match_uses_first_seen_per_key() {
        let features = vec![
            feature("I 25", None, 243.2, 40.336, -104.993),
            feature("I 25", None, 243.4, 40.999, -104.999),
        ];
        let index = RouteReferenceIndex::build(&features, None, None).unwrap();
        let (point, kind) = index.query_match(242.6).unwrap();
        assert_eq!(kind, MatchKind::RoundedInteger);
        assert!((point.ref_value - 243.2).abs() < 1e-9);
    }

    #[test]
    fn half_mile_offset_skips_rounded_tier() {
        // 246.5 rounds to 247; neither 243 nor 250 does, so the rounded
        // tier misses and the nearest tier must answer.
        let index = RouteReferenceIndex::build(&i25_segment(), None, None).unwrap();
        let (_, kind) = index.query_match(246.5).unwrap();
        assert_eq!(kind, MatchKind::Nearest);
    }

    #[test]
    fn nearest_tie_prefers_first_inserted() {
        // |246.5 - 243| == |246.5 - 250| == 3.5
        let index = RouteReferenceIndex::build(&i25_segment(), None, None).unwrap();
        let (point, kind) = index.query_match(246.5).unwrap();
        assert_eq!(kind, MatchKind::Nearest);
        assert!((point.ref_value - 243.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_minimizes_absolute_difference() {
        let features = vec![
            feature("I 25", None, 240.1, 40.5, -104.9),
            feature("I 25", None, 243.2, 40.336, -104.993),
            feature("I 25", None, 250.7, 40.185, -104.981),
        ];
        let index = RouteReferenceIndex::build(&features, None, None).unwrap();
        for offset in [239.0_f64, 241.9, 246.4, 248.0, 251.3, 299.0] {
            let (point, _) = index.query_match(offset).unwrap();
            let best = (point.ref_value - offset).abs();
            for candidate in [240.1_f64, 243.2, 250.7] {
                assert!(
                    best <= (candidate - offset).abs() + 1e-12,
                    "offset {offset}: {} is not nearest",
                    point.ref_value
                );
            }
        }
    }

    #[test]
    fn route_filter_is_case_insensitive() {
        let index = RouteReferenceIndex::build(&i25_segment(), Some(" i 25 "), Some("co")).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn mismatched_filters_are_empty_reference_set() {
        let features = vec![feature("I 25", Some("WY"), 243.0, 41.1, -104.8)];
        let err = RouteReferenceIndex::build(&features, Some("I 25A"), Some("CO")).unwrap_err();
        assert!(matches!(err, ReferenceError::EmptyReferenceSet { .. }));
    }

    #[test]
    fn state_filter_without_state_attribute_is_schema_error() {
        let features = vec![feature("I 25", None, 243.0, 40.336, -104.993)];
        let err = RouteReferenceIndex::build(&features, None, Some("CO")).unwrap_err();
        assert!(matches!(err, ReferenceError::Schema { .. }));
    }

    #[test]
    fn invalid_coordinates_are_skipped() {
        let features = vec![
            feature("I 25", None, 243.0, 140.0, -104.993),
            feature("I 25", None, 250.0, 40.185, -104.981),
        ];
        let index = RouteReferenceIndex::build(&features, None, None).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn numeric_route_attributes_are_stringified() {
        let mut properties = serde_json::Map::new();
        properties.insert("route_no".to_string(), json!(25));
        properties.insert("milepost".to_string(), json!("243.0"));
        let features = vec![RawReferenceFeature {
            properties,
            point: LatLon::new(40.336, -104.993),
        }];
        let index = RouteReferenceIndex::build(&features, Some("25"), None).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn query_is_deterministic() {
        let features = vec![
            feature("I 25", None, 243.0, 40.336, -104.993),
            feature("I 25", None, 243.0, 40.999, -104.999),
            feature("I 25", None, 250.0, 40.185, -104.981),
        ];
        let index = RouteReferenceIndex::build(&features, None, None).unwrap();
        for offset in [243.0, 246.5, 250.2, 1000.0] {
            let first = index.query_match(offset).map(|(p, k)| (p.clone(), k));
            let second = index.query_match(offset).map(|(p, k)| (p.clone(), k));
            assert_eq!(first, second);
        }
    }
}
