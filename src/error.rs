//! Error types for the attendance engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the attendance, office and payroll operations can report.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::GeoPoint;

/// The main error type for the attendance engine.
///
/// Domain errors (validation, duplicate check-in, geofence) are returned to the
/// caller with enough context to explain the failure. Infrastructure errors
/// (`Persistence`) are logged in full and surfaced generically.
///
/// # Example
///
/// ```
/// use attendance_engine::error::EngineError;
///
/// let error = EngineError::InvalidOffice {
///     office_id: "branch-7".to_string(),
/// };
/// assert_eq!(error.to_string(), "Invalid office location: branch-7");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// A request field was missing or malformed.
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The user already has an open shift and must check out first.
    #[error("User {user_id} already has an active check-in")]
    DuplicateCheckIn {
        /// The user that tried to check in.
        user_id: String,
    },

    /// The user has no open shift to close.
    #[error("No active check-in found for user {user_id}")]
    NoOpenShift {
        /// The user that tried to check out.
        user_id: String,
    },

    /// The user has no open shift that started on the given civil date.
    #[error("No open check-in found for user {user_id} on {date}")]
    NoOpenShiftForDate {
        /// The user that was looked up.
        user_id: String,
        /// The civil date that was searched.
        date: NaiveDate,
    },

    /// The office identifier resolved neither from storage nor from the fallback table.
    #[error("Invalid office location: {office_id}")]
    InvalidOffice {
        /// The unresolvable office identifier.
        office_id: String,
    },

    /// The submitted coordinates fall outside the office geofence.
    #[error(
        "Location is {distance_meters:.1}m from office '{office_id}', outside the allowed {office_radius}m radius"
    )]
    GeofenceViolation {
        /// The office that was checked against.
        office_id: String,
        /// Where the user claimed to be.
        user_coordinates: GeoPoint,
        /// Where the office is.
        office_coordinates: GeoPoint,
        /// The allowed radius in meters.
        office_radius: f64,
        /// The computed great-circle distance in meters.
        distance_meters: f64,
    },

    /// The referenced user does not exist in the user directory.
    #[error("User not found: {user_id}")]
    UserNotFound {
        /// The missing user.
        user_id: String,
    },

    /// No salary record exists for the given user and month.
    #[error("Salary record not found for user {user_id}, {month}/{year}")]
    SalaryRecordNotFound {
        /// The user.
        user_id: String,
        /// Month (1-12).
        month: u32,
        /// Year.
        year: i32,
    },

    /// An office with this identifier is already registered.
    #[error("Office ID already exists: {office_id}")]
    OfficeAlreadyExists {
        /// The duplicate identifier.
        office_id: String,
    },

    /// No persisted office has this identifier.
    #[error("Office not found: {office_id}")]
    OfficeNotFound {
        /// The missing identifier.
        office_id: String,
    },

    /// A storage round-trip failed.
    #[error("Persistence error during {operation}: {message}")]
    Persistence {
        /// The operation that failed.
        operation: String,
        /// Backend-specific description.
        message: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EngineError::Persistence`] error.
    pub fn persistence(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Persistence {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true for infrastructure failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Persistence { .. })
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
