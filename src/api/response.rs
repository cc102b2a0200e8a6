//! Response types for the attendance API.
//!
//! This module defines the error body every endpoint returns on failure and
//! the mapping from [`EngineError`] to HTTP status codes. Domain errors are
//! returned with their full message; infrastructure errors become a generic
//! 500 and are logged instead. Success bodies are camelCase.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::EngineError;
use crate::models::{AttendanceRecord, GeoPoint, Office, SalaryRecord, User};
use crate::services::{
    AttendanceEntry, CheckOutOutcome, FailedJob, FailedMonth, RateChangeOutcome, SalarySummary,
};

/// The inputs of a failed geofence check, returned so clients can explain
/// the rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceFailure {
    /// Always false.
    pub is_valid: bool,
    /// The office checked against.
    pub office_id: String,
    /// Submitted `[longitude, latitude]`.
    pub user_coordinates: GeoPoint,
    /// Office `[longitude, latitude]`.
    pub office_coordinates: GeoPoint,
    /// Allowed radius in meters.
    pub office_radius: f64,
    /// Computed distance in meters.
    pub distance_meters: f64,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Present only for geofence rejections.
    #[serde(flatten)]
    pub geofence: Option<GeofenceFailure>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            geofence: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(code, message)
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response carrying `error`.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            Json(self.error),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        let (status, error) = match error {
            EngineError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::with_details("VALIDATION_ERROR", message, field),
            ),
            EngineError::DuplicateCheckIn { .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "DUPLICATE_CHECK_IN",
                    message,
                    "Check out of the open shift before checking in again",
                ),
            ),
            EngineError::NoOpenShift { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::new("NO_OPEN_SHIFT", message),
            ),
            EngineError::NoOpenShiftForDate { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::new("NO_OPEN_SHIFT_FOR_DATE", message),
            ),
            EngineError::InvalidOffice { .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_OFFICE", message),
            ),
            EngineError::GeofenceViolation {
                office_id,
                user_coordinates,
                office_coordinates,
                office_radius,
                distance_meters,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    geofence: Some(GeofenceFailure {
                        is_valid: false,
                        office_id,
                        user_coordinates,
                        office_coordinates,
                        office_radius,
                        distance_meters,
                    }),
                    ..ApiError::new("GEOFENCE_VIOLATION", message)
                },
            ),
            EngineError::UserNotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::new("USER_NOT_FOUND", message),
            ),
            EngineError::SalaryRecordNotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::with_details(
                    "SALARY_RECORD_NOT_FOUND",
                    message,
                    "Calculate the month before adding adjustments",
                ),
            ),
            EngineError::OfficeAlreadyExists { .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::new("OFFICE_ALREADY_EXISTS", message),
            ),
            EngineError::OfficeNotFound { .. } => (
                StatusCode::NOT_FOUND,
                ApiError::new("OFFICE_NOT_FOUND", message),
            ),
            EngineError::Persistence { operation, message } => {
                error!(operation = %operation, error = %message, "Storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal())
            }
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                error!(error = %message, "Configuration failure while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal())
            }
        };
        ApiErrorResponse { status, error }
    }
}

/// Body of a successful check-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The opened record.
    pub attendance: AttendanceRecord,
    /// Always true; rejected check-ins return an error body.
    pub is_valid: bool,
}

/// Body of a successful check-out or manual check-out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Always true.
    pub is_valid: bool,
    /// The closed record, worked minutes and warnings.
    #[serde(flatten)]
    pub outcome: CheckOutOutcome,
}

/// Body of a created manual record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRecordResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The created record.
    pub attendance: AttendanceRecord,
    /// Set when the record was created closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_time_formatted: Option<String>,
}

/// Body of `GET /attendance/:userId`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistoryResponse {
    /// The user whose records are listed.
    pub user_id: String,
    /// Number of records.
    pub count: usize,
    /// Records, most recent first.
    pub attendance: Vec<AttendanceEntry>,
}

/// Body of `GET /attendance/all`.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceListResponse {
    /// Number of records.
    pub count: usize,
    /// Records, most recent first.
    pub attendance: Vec<AttendanceEntry>,
}

/// Body of `GET /offices`.
#[derive(Debug, Clone, Serialize)]
pub struct OfficeListResponse {
    /// Number of offices.
    pub count: usize,
    /// Persisted offices ordered by ID.
    pub offices: Vec<Office>,
}

/// Body of `DELETE /offices/:officeId`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeDeletedResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The removed office.
    pub office_id: String,
}

/// The user fields shown next to salary data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollUser {
    /// User ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Current hourly rate.
    pub hourly_rate: Decimal,
}

impl From<User> for PayrollUser {
    fn from(user: User) -> Self {
        PayrollUser {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            hourly_rate: user.hourly_rate,
        }
    }
}

/// Body of `POST /salary/calculate`.
#[derive(Debug, Clone, Serialize)]
pub struct SalaryCalculationResponse {
    /// The stored record.
    pub salary: SalaryRecord,
    /// Who it was computed for.
    pub user: PayrollUser,
    /// Display summary of the record.
    pub summary: SalarySummary,
}

/// A salary record with an outcome message.
#[derive(Debug, Clone, Serialize)]
pub struct SalaryMessageResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The affected record.
    pub salary: SalaryRecord,
}

/// Body of `PUT /salary/rate/:userId`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateChangeResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The user with the new rate.
    pub user: PayrollUser,
    /// Rate before the change.
    pub previous_rate: Decimal,
    /// Months rewritten at the new rate.
    pub recomputed: Vec<SalaryRecord>,
    /// Months that could not be rewritten.
    pub failed: Vec<FailedMonth>,
}

impl From<RateChangeOutcome> for RateChangeResponse {
    fn from(outcome: RateChangeOutcome) -> Self {
        let message = if !outcome.failed.is_empty() {
            format!(
                "Hourly rate updated; {} month(s) recalculated, {} failed",
                outcome.recomputed.len(),
                outcome.failed.len()
            )
        } else if outcome.recomputed.is_empty() {
            "Hourly rate updated; existing salary records are unchanged".to_string()
        } else {
            format!(
                "Hourly rate updated; {} month(s) recalculated",
                outcome.recomputed.len()
            )
        };
        RateChangeResponse {
            message,
            user: outcome.user.into(),
            previous_rate: outcome.previous_rate,
            recomputed: outcome.recomputed,
            failed: outcome.failed,
        }
    }
}

/// Body of `GET /salary/user/:userId`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryHistoryResponse {
    /// Number of records.
    pub count: usize,
    /// Records, newest month first.
    pub salary_history: Vec<SalaryRecord>,
}

/// Body of `GET /salary/users`.
#[derive(Debug, Clone, Serialize)]
pub struct PayrollUserListResponse {
    /// Number of users.
    pub count: usize,
    /// Non-admin users.
    pub users: Vec<PayrollUser>,
}

/// Body of `GET /salary/recompute/failed`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedJobListResponse {
    /// Number of dead-lettered jobs.
    pub count: usize,
    /// Jobs, oldest first.
    pub jobs: Vec<FailedJob>,
}

/// Body of `POST /salary/recompute/replay`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Jobs put back on the queue.
    pub replayed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_error_omits_details_and_geofence_fields() {
        let error = ApiError::new("NO_OPEN_SHIFT", "No open shift for user u1");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "NO_OPEN_SHIFT");
        assert_eq!(json["message"], "No open shift for user u1");
        assert!(json.get("details").is_none());
        assert!(json.get("isValid").is_none());
    }

    #[test]
    fn test_validation_error_names_field_in_details() {
        let error = ApiError::with_details("VALIDATION_ERROR", "Invalid month", "month");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["details"], "month");
    }

    #[test]
    fn test_geofence_violation_carries_distance_inputs() {
        let response: ApiErrorResponse = EngineError::GeofenceViolation {
            office_id: "main".to_string(),
            user_coordinates: GeoPoint::new(106.0, 10.01),
            office_coordinates: GeoPoint::new(106.0, 10.0),
            office_radius: 50.0,
            distance_meters: 1111.9,
        }
        .into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let json = serde_json::to_value(&response.error).unwrap();
        assert_eq!(json["code"], "GEOFENCE_VIOLATION");
        assert_eq!(json["isValid"], false);
        assert_eq!(json["userCoordinates"], serde_json::json!([106.0, 10.01]));
        assert_eq!(json["officeCoordinates"], serde_json::json!([106.0, 10.0]));
        assert_eq!(json["officeRadius"], 50.0);
        assert_eq!(json["distanceMeters"], 1111.9);
    }

    #[test]
    fn test_not_found_errors_map_to_404() {
        let cases = [
            EngineError::NoOpenShift {
                user_id: "u1".to_string(),
            },
            EngineError::UserNotFound {
                user_id: "u1".to_string(),
            },
            EngineError::OfficeNotFound {
                office_id: "x".to_string(),
            },
            EngineError::SalaryRecordNotFound {
                user_id: "u1".to_string(),
                month: 6,
                year: 2025,
            },
        ];
        for error in cases {
            let response: ApiErrorResponse = error.into();
            assert_eq!(response.status, StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_persistence_error_hides_internals() {
        let response: ApiErrorResponse =
            EngineError::persistence("update_record", "disk full at /var/lib/db").into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.code, "INTERNAL_ERROR");
        assert!(!response.error.message.contains("disk full"));
        assert!(response.error.details.is_none());
    }

    #[test]
    fn test_duplicate_check_in_is_bad_request() {
        let response: ApiErrorResponse = EngineError::DuplicateCheckIn {
            user_id: "u1".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.code, "DUPLICATE_CHECK_IN");
    }
}
