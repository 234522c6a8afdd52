// crates/geobucket-core/src/grid.rs

//! # Grid Quantization
//!
//! Maps raw coordinates onto a fixed-size lat/lng grid. Two points share a
//! bucket exactly when they quantize to the same [`BucketKey`].
//!
//! Rounding rule: `f64::round`, i.e. **round half away from zero**, applied
//! to `coordinate / grid_size`. The quotient is taken as computed in `f64`,
//! so a coordinate written as an exact half-step in decimal may land on
//! either side once binary representation error is involved; the rule is
//! still applied identically on every call, which is what keeps keys stable.

use crate::error::ValidationError;
use crate::model::BucketKey;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A validated WGS84 coordinate pair.
///
/// Deserialization goes through [`GeoPoint::new`], so snapshots and JSON
/// with out-of-range coordinates are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = ValidationError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    /// Rejects non-finite values, `|lat| > 90` and `|lng| > 180`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::InvalidLongitude(lng));
        }
        Ok(GeoPoint { lat, lng })
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle (haversine) distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let (phi1, phi2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// The quantized cell a coordinate falls into.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub lat: f64,
    pub lng: f64,
    pub key: BucketKey,
}

impl GridCell {
    /// Representative point of the cell; this is what buckets store as centroid.
    pub fn centroid(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Quantize a coordinate pair onto a grid of `grid_size` degrees.
///
/// Pure and total for finite input. Range checks belong to the caller
/// (see [`GeoPoint::new`]); `grid_size` is validated by
/// [`crate::config::GeoBucketConfig::validate`].
///
/// ```rust
/// use geobucket_core::grid::quantize;
///
/// let cell = quantize(6.4698, 3.6285, 0.005);
/// assert_eq!(cell.key.as_str(), "6.470_3.630");
/// ```
pub fn quantize(lat: f64, lng: f64, grid_size: f64) -> GridCell {
    let bucket_lat = snap(lat, grid_size).clamp(-90.0, 90.0);
    let bucket_lng = snap(lng, grid_size).clamp(-180.0, 180.0);
    GridCell {
        key: BucketKey::from_cell(bucket_lat, bucket_lng),
        lat: bucket_lat,
        lng: bucket_lng,
    }
}

#[inline]
fn snap(value: f64, grid_size: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so keys never print as "-0.000".
    (value / grid_size).round() * grid_size + 0.0
}
