//! Office model and resolved geofence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Radius applied to offices created without an explicit one.
pub const DEFAULT_OFFICE_RADIUS_METERS: f64 = 200.0;

/// An office persisted by administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    /// Unique key.
    pub office_id: String,
    /// Display name.
    pub name: String,
    /// Centre of the geofence.
    pub location: GeoPoint,
    /// Geofence radius in meters.
    pub radius: f64,
    /// Optional street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Inactive offices do not resolve.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Where a [`ResolvedOffice`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeSource {
    /// The office store.
    Persisted,
    /// The configured fallback table.
    Fallback,
}

/// The geofence an attendance check is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOffice {
    /// The office identifier that was resolved.
    pub office_id: String,
    /// Display name.
    pub name: String,
    /// Centre of the geofence.
    pub coordinates: GeoPoint,
    /// Radius in meters.
    pub radius: f64,
    /// Which source resolved the office.
    pub source: OfficeSource,
}

impl From<&Office> for ResolvedOffice {
    fn from(office: &Office) -> Self {
        Self {
            office_id: office.office_id.clone(),
            name: office.name.clone(),
            coordinates: office.location,
            radius: office.radius,
            source: OfficeSource::Persisted,
        }
    }
}
