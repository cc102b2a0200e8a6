//! Geofence evaluation.
//!
//! Great-circle distance between two `[longitude, latitude]` points using the
//! haversine formula on a spherical earth, and the radius check built on it.
//! Accurate to roughly 0.5% for non-antipodal points, which is ample for
//! office radii of tens to hundreds of meters.

use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Radius applied when the caller does not supply one.
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 100.0;

/// Outcome of checking a coordinate against an office geofence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceCheck {
    /// Great-circle distance between the two points in meters.
    pub distance_meters: f64,
    /// The radius that was applied.
    pub radius_meters: f64,
    /// True iff `distance_meters <= radius_meters`.
    pub within_radius: bool,
}

/// Calculates the great-circle distance between two points in meters.
///
/// # Example
///
/// ```
/// use attendance_engine::calculation::calculate_distance;
/// use attendance_engine::models::GeoPoint;
///
/// let office = GeoPoint::new(106.667976, 10.846469);
/// assert_eq!(calculate_distance(office, office), 0.0);
/// ```
pub fn calculate_distance(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let sin_half_phi = (delta_phi / 2.0).sin();
    let sin_half_lambda = (delta_lambda / 2.0).sin();

    let a = sin_half_phi * sin_half_phi
        + phi1.cos() * phi2.cos() * sin_half_lambda * sin_half_lambda;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Returns true iff `user` lies within `max_distance_meters` of `office`.
///
/// `None` applies [`DEFAULT_MAX_DISTANCE_METERS`].
pub fn is_within_radius(
    user: GeoPoint,
    office: GeoPoint,
    max_distance_meters: Option<f64>,
) -> bool {
    check_geofence(user, office, max_distance_meters).within_radius
}

/// Evaluates the geofence and keeps the computed distance for reporting.
pub fn check_geofence(
    user: GeoPoint,
    office: GeoPoint,
    max_distance_meters: Option<f64>,
) -> GeofenceCheck {
    let radius_meters = max_distance_meters.unwrap_or(DEFAULT_MAX_DISTANCE_METERS);
    let distance_meters = calculate_distance(user, office);
    GeofenceCheck {
        distance_meters,
        radius_meters,
        within_radius: distance_meters <= radius_meters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OFFICE: GeoPoint = GeoPoint::new(106.667976, 10.846469);

    /// A point `meters` due north of `origin`; along a meridian the haversine
    /// distance equals the arc length.
    fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
        let delta_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint::new(origin.longitude, origin.latitude + delta_lat)
    }

    #[test]
    fn test_point_60m_away_fails_50m_radius() {
        let user = north_of(OFFICE, 60.0);
        assert!((calculate_distance(user, OFFICE) - 60.0).abs() < 1e-3);
        assert!(!is_within_radius(user, OFFICE, Some(50.0)));
    }

    #[test]
    fn test_point_40m_away_passes_50m_radius() {
        let user = north_of(OFFICE, 40.0);
        assert!((calculate_distance(user, OFFICE) - 40.0).abs() < 1e-3);
        assert!(is_within_radius(user, OFFICE, Some(50.0)));
    }

    #[test]
    fn test_default_radius_is_100m() {
        assert!(is_within_radius(north_of(OFFICE, 95.0), OFFICE, None));
        assert!(!is_within_radius(north_of(OFFICE, 105.0), OFFICE, None));
    }

    #[test]
    fn test_longitude_first_convention() {
        // First element is longitude: one degree east at 60°N is about half
        // of the ~111 km a degree of latitude would be.
        let a = GeoPoint::new(0.0, 60.0);
        let b = GeoPoint::new(1.0, 60.0);
        let distance = calculate_distance(a, b);
        assert!((distance - 55_597.0).abs() < 100.0, "got {distance}");
    }

    #[test]
    fn test_zero_coordinates_are_valid() {
        let origin = GeoPoint::origin();
        assert_eq!(calculate_distance(origin, origin), 0.0);
        assert!(is_within_radius(origin, origin, Some(0.0)));
    }

    #[test]
    fn test_check_reports_distance_and_radius() {
        let check = check_geofence(north_of(OFFICE, 60.0), OFFICE, Some(50.0));
        assert!(!check.within_radius);
        assert_eq!(check.radius_meters, 50.0);
        assert!(check.distance_meters > 59.9 && check.distance_meters < 60.1);
    }

    fn coordinate() -> impl Strategy<Value = GeoPoint> {
        (-180.0f64..180.0, -89.9f64..89.9).prop_map(|(lon, lat)| GeoPoint::new(lon, lat))
    }

    proptest! {
        #[test]
        fn prop_identical_points_have_zero_distance(point in coordinate(), radius in 0.0f64..10_000.0) {
            prop_assert_eq!(calculate_distance(point, point), 0.0);
            prop_assert!(is_within_radius(point, point, Some(radius)));
        }

        #[test]
        fn prop_distance_is_symmetric(a in coordinate(), b in coordinate()) {
            let ab = calculate_distance(a, b);
            let ba = calculate_distance(b, a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_radius_check_is_symmetric(a in coordinate(), b in coordinate(), radius in 0.0f64..50_000.0) {
            prop_assert_eq!(
                is_within_radius(a, b, Some(radius)),
                is_within_radius(b, a, Some(radius))
            );
        }
    }
}
