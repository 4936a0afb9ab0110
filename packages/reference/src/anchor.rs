//! Two-anchor linear interpolation model.
//!
//! The degenerate reference layer: two mileposts with known coordinates
//! define a line, and every offset resolves by interpolating latitude
//! and longitude independently. Offsets outside the anchor range
//! extrapolate; callers needing bounds must clamp before querying.

use crash_map_crash_models::{LatLon, MatchKind};

use crate::{MilepostModel, ReferenceError, Resolution};

/// Default anchors for I-25 Segment 5 between Mead and Johnstown,
/// Colorado: MP 243 and MP 250 with surveyed coordinates.
pub const I25_SEGMENT_5_ANCHORS: (f64, LatLon, f64, LatLon) = (
    243.0,
    LatLon::new(40.336, -104.993),
    250.0,
    LatLon::new(40.185, -104.981),
);

/// Milepost model defined by two fixed anchor points.
///
/// Always resolves any finite offset with [`MatchKind::Interpolated`];
/// it has no unresolved case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAnchorModel {
    start_offset: f64,
    start_coord: LatLon,
    end_offset: f64,
    end_coord: LatLon,
}

impl LinearAnchorModel {
    /// Builds the model from two anchors.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::DegenerateAnchor`] when the two anchor
    /// offsets coincide (the interpolation ratio would divide by zero).
    pub fn build(
        start_offset: f64,
        start_coord: LatLon,
        end_offset: f64,
        end_coord: LatLon,
    ) -> Result<Self, ReferenceError> {
        if start_offset == end_offset {
            return Err(ReferenceError::DegenerateAnchor {
                offset: start_offset,
            });
        }
        Ok(Self {
            start_offset,
            start_coord,
            end_offset,
            end_coord,
        })
    }

    /// Builds the default I-25 Segment 5 model.
    #[must_use]
    pub fn i25_segment_5() -> Self {
        let (start_offset, start_coord, end_offset, end_coord) = I25_SEGMENT_5_ANCHORS;
        // Anchor offsets are distinct constants; build cannot fail.
        Self {
            start_offset,
            start_coord,
            end_offset,
            end_coord,
        }
    }

    /// Interpolates a coordinate for the offset. No clamping: offsets
    /// outside the anchor range extrapolate linearly.
    #[must_use]
    pub fn interpolate(&self, offset: f64) -> LatLon {
        let ratio = (offset - self.start_offset) / (self.end_offset - self.start_offset);
        LatLon::new(
            ratio.mul_add(self.end_coord.lat - self.start_coord.lat, self.start_coord.lat),
            ratio.mul_add(self.end_coord.lon - self.start_coord.lon, self.start_coord.lon),
        )
    }
}

impl MilepostModel for LinearAnchorModel {
    fn query(&self, offset: f64) -> Resolution {
        Resolution::Resolved {
            coordinate: self.interpolate(offset),
            match_kind: MatchKind::Interpolated,
        }
    }
}
