//! Geographic point type.
//!
//! Coordinates are always stored and exchanged in GeoJSON order,
//! `[longitude, latitude]`, in decimal degrees.

use serde::{Deserialize, Serialize};

/// A point on the earth's surface.
///
/// Serializes as a two-element array `[longitude, latitude]`.
///
/// # Example
///
/// ```
/// use attendance_engine::models::GeoPoint;
///
/// let point = GeoPoint::new(106.667976, 10.846469);
/// let json = serde_json::to_string(&point).unwrap();
/// assert_eq!(json, "[106.667976,10.846469]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude, in that order.
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// The `[0, 0]` placeholder used for records created without a GPS fix.
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Returns true if longitude is within ±180 and latitude within ±90.
    ///
    /// A point written `[latitude, longitude]` by mistake usually fails this.
    pub fn is_in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude) && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self::new(longitude, latitude)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.longitude, point.latitude]
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.longitude, self.latitude)
    }
}
