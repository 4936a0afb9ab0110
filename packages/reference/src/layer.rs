//! Reference layer loading from `GeoJSON`.
//!
//! Parses a point-feature collection into [`RawReferenceFeature`]s,
//! normalizing geometry to geographic WGS84 on load. `GeoJSON` is WGS84
//! by definition; legacy files carrying a `crs` member are honored for
//! CRS84/EPSG:4326 and converted for EPSG:3857 (spherical web
//! mercator). Any other named CRS is rejected up front rather than
//! indexed with wrong coordinates.

use std::io::Read;

use crash_map_crash_models::LatLon;
use geojson::{FeatureCollection, GeoJson};

use crate::{RawReferenceFeature, ReferenceError};

/// WGS84 semi-major axis, the sphere radius used by EPSG:3857.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Coordinate reference systems a layer may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerCrs {
    Wgs84,
    WebMercator,
}

/// Loads reference-layer point features from `GeoJSON`.
///
/// Features without point geometry or without properties are skipped
/// with a warning count; attribute-role detection and filtering happen
/// later in [`crate::RouteReferenceIndex::build`].
///
/// # Errors
///
/// * [`ReferenceError::Io`] when reading fails.
/// * [`ReferenceError::Json`] when the input is not valid `GeoJSON`.
/// * [`ReferenceError::Schema`] when the input is not a feature
///   collection or declares an unsupported CRS.
pub fn load_geojson(mut reader: impl Read) -> Result<Vec<RawReferenceFeature>, ReferenceError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;

    let geojson: GeoJson = raw.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ReferenceError::Schema {
            message: "reference layer must be a GeoJSON FeatureCollection of point features"
                .to_string(),
        });
    };

    let crs = declared_crs(&collection)?;

    let mut features = Vec::new();
    let mut skipped = 0_usize;

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let Ok(geo_geom) = geo::Geometry::<f64>::try_from(geometry) else {
            skipped += 1;
            continue;
        };
        let geo::Geometry::Point(point) = geo_geom else {
            skipped += 1;
            continue;
        };

        let coordinate = match crs {
            LayerCrs::Wgs84 => LatLon::new(point.y(), point.x()),
            LayerCrs::WebMercator => web_mercator_to_wgs84(point.x(), point.y()),
        };

        features.push(RawReferenceFeature {
            properties: feature.properties.unwrap_or_default(),
            point: coordinate,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} reference features without point geometry");
    }
    log::info!("Loaded {} reference features from layer", features.len());

    Ok(features)
}

/// Reads the legacy `crs` foreign member, defaulting to WGS84.
fn declared_crs(collection: &FeatureCollection) -> Result<LayerCrs, ReferenceError> {
    let Some(name) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(LayerCrs::Wgs84);
    };

    let upper = name.to_uppercase();
    if upper.contains("CRS84") || upper.contains("4326") {
        Ok(LayerCrs::Wgs84)
    } else if upper.contains("3857") || upper.contains("900913") {
        Ok(LayerCrs::WebMercator)
    } else {
        Err(ReferenceError::Schema {
            message: format!("unsupported coordinate reference system: {name}"),
        })
    }
}

/// Inverse spherical-mercator projection (EPSG:3857 -> WGS84 degrees).
fn web_mercator_to_wgs84(x: f64, y: f64) -> LatLon {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = 2.0_f64
        .mul_add((y / EARTH_RADIUS_M).exp().atan(), -std::f64::consts::FRAC_PI_2)
        .to_degrees();
    LatLon::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteReferenceIndex;

    const WGS84_LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ROUTE": "I 25", "STATE": "CO", "MILEPOINT": 243.0},
                "geometry": {"type": "Point", "coordinates": [-104.993, 40.336]}
            },
            {
                "type": "Feature",
                "properties": {"ROUTE": "I 25", "STATE": "CO", "MILEPOINT": 250.0},
                "geometry": {"type": "Point", "coordinates": [-104.981, 40.185]}
            }
        ]
    }"#;

    #[test]
    fn loads_wgs84_point_features() {
        let features = load_geojson(WGS84_LAYER.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);
        assert!((features[0].point.lat - 40.336).abs() < 1e-9);
        assert!((features[0].point.lon - -104.993).abs() < 1e-9);
    }

    #[test]
    fn loaded_layer_builds_an_index() {
        let features = load_geojson(WGS84_LAYER.as_bytes()).unwrap();
        let index = RouteReferenceIndex::build(&features, Some("I 25"), Some("CO")).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn skips_non_point_geometry() {
        let layer = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ROUTE": "I 25", "MILEPOINT": 243.0},
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-104.993, 40.336], [-104.981, 40.185]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"ROUTE": "I 25", "MILEPOINT": 250.0},
                    "geometry": {"type": "Point", "coordinates": [-104.981, 40.185]}
                }
            ]
        }"#;
        let features = load_geojson(layer.as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
    }

    #[test]
    fn web_mercator_layer_is_converted_on_load() {
        // Forward-project the MP 243 anchor, then confirm load recovers it.
        let lat = 40.336_f64;
        let lon = -104.993_f64;
        let x = EARTH_RADIUS_M * lon.to_radians();
        let y = EARTH_RADIUS_M
            * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();

        let layer = format!(
            r#"{{
                "type": "FeatureCollection",
                "crs": {{"type": "name", "properties": {{"name": "EPSG:3857"}}}},
                "features": [
                    {{
                        "type": "Feature",
                        "properties": {{"ROUTE": "I 25", "MILEPOINT": 243.0}},
                        "geometry": {{"type": "Point", "coordinates": [{x}, {y}]}}
                    }}
                ]
            }}"#
        );
        let features = load_geojson(layer.as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
        assert!((features[0].point.lat - lat).abs() < 1e-6);
        assert!((features[0].point.lon - lon).abs() < 1e-6);
    }

    #[test]
    fn crs84_declaration_passes_through() {
        let layer = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ROUTE": "I 25", "MILEPOINT": 243.0},
                    "geometry": {"type": "Point", "coordinates": [-104.993, 40.336]}
                }
            ]
        }"#;
        let features = load_geojson(layer.as_bytes()).unwrap();
        assert!((features[0].point.lat - 40.336).abs() < 1e-9);
    }

    #[test]
    fn unsupported_crs_is_schema_error() {
        let layer = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:26913"}},
            "features": []
        }"#;
        let err = load_geojson(layer.as_bytes()).unwrap_err();
        assert!(matches!(err, ReferenceError::Schema { .. }));
    }

    #[test]
    fn non_collection_input_is_schema_error() {
        let layer = r#"{"type": "Point", "coordinates": [-104.993, 40.336]}"#;
        let err = load_geojson(layer.as_bytes()).unwrap_err();
        assert!(matches!(err, ReferenceError::Schema { .. }));
    }
}
