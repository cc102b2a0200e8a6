//! Configuration types for the attendance engine.
//!
//! This module contains the strongly-typed structures deserialized from the
//! YAML configuration files, and the assembled [`EngineConfig`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::calculation::{CivilCalendar, DEFAULT_MAX_DISTANCE_METERS};
use crate::models::{GeoPoint, User};

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind, e.g. `0.0.0.0:5000`.
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Geofence settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeofenceSettings {
    /// Radius used for offices that do not specify one.
    pub default_radius_meters: f64,
}

impl Default for GeofenceSettings {
    fn default() -> Self {
        Self {
            default_radius_meters: DEFAULT_MAX_DISTANCE_METERS,
        }
    }
}

/// Attendance settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttendanceSettings {
    /// Shifts longer than this are closed with a warning.
    pub long_shift_warning_hours: u32,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            long_shift_warning_hours: 24,
        }
    }
}

/// Background payroll recompute settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PayrollSettings {
    /// Attempts per recompute job before it is dead-lettered.
    pub max_attempts: u32,
    /// Delay between attempts, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 200,
        }
    }
}

/// Contents of `settings.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// IANA name of the civil timezone used for day and month boundaries.
    pub timezone: String,
    /// Geofence settings.
    pub geofence: GeofenceSettings,
    /// Attendance settings.
    pub attendance: AttendanceSettings,
    /// Payroll settings.
    pub payroll: PayrollSettings,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            timezone: "Asia/Ho_Chi_Minh".to_string(),
            geofence: GeofenceSettings::default(),
            attendance: AttendanceSettings::default(),
            payroll: PayrollSettings::default(),
        }
    }
}

/// An entry of the fallback office table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FallbackOffice {
    /// Display name.
    pub name: String,
    /// `[longitude, latitude]`.
    pub coordinates: GeoPoint,
    /// Geofence radius in meters. Falls back to the configured default.
    #[serde(default)]
    pub radius: Option<f64>,
}

/// Contents of `offices.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct OfficesFile {
    /// Fallback offices keyed by office ID.
    pub offices: BTreeMap<String, FallbackOffice>,
}

/// Contents of `users.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersFile {
    /// Users that seed the directory.
    #[serde(default)]
    pub users: Vec<User>,
}

/// The assembled engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Civil calendar for the deployment timezone.
    pub calendar: CivilCalendar,
    /// Geofence settings.
    pub geofence: GeofenceSettings,
    /// Attendance settings.
    pub attendance: AttendanceSettings,
    /// Payroll settings.
    pub payroll: PayrollSettings,
    /// Offices that resolve when no persisted office matches.
    pub fallback_offices: BTreeMap<String, FallbackOffice>,
    /// Users that seed the directory at startup.
    pub seed_users: Vec<User>,
}

impl Default for EngineConfig {
    /// Built-in configuration: UTC+7 civil time and the single `main` office.
    fn default() -> Self {
        let mut fallback_offices = BTreeMap::new();
        fallback_offices.insert(
            "main".to_string(),
            FallbackOffice {
                name: "Main Office".to_string(),
                coordinates: GeoPoint::new(106.667976, 10.846469),
                radius: Some(50.0),
            },
        );

        Self {
            server: ServerSettings::default(),
            calendar: CivilCalendar::new(chrono_tz::Asia::Ho_Chi_Minh),
            geofence: GeofenceSettings::default(),
            attendance: AttendanceSettings::default(),
            payroll: PayrollSettings::default(),
            fallback_offices,
            seed_users: Vec::new(),
        }
    }
}
