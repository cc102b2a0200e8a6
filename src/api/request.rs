//! Request types for the attendance API.
//!
//! This module defines the JSON bodies and query strings accepted by the
//! endpoints, and their conversion into service inputs. Field names are
//! camelCase on the wire.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{AdjustmentKind, GeoPoint};
use crate::services::{CheckIn, CheckOut, ManualCheckOut, ManualRecord, NewOffice, OfficeUpdate};

/// Body of `POST /attendance/checkin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// The user checking in.
    pub user_id: String,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Office to check in at. Defaults to `main`.
    #[serde(default)]
    pub office_id: Option<String>,
    /// Free text stored on the record.
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<CheckInRequest> for CheckIn {
    fn from(req: CheckInRequest) -> Self {
        CheckIn {
            user_id: req.user_id,
            location: GeoPoint::new(req.longitude, req.latitude),
            office_id: req.office_id,
            notes: req.notes,
        }
    }
}

/// Body of `POST /attendance/checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    /// The user checking out.
    pub user_id: String,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Appended to the record's notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<CheckOutRequest> for CheckOut {
    fn from(req: CheckOutRequest) -> Self {
        CheckOut {
            user_id: req.user_id,
            location: GeoPoint::new(req.longitude, req.latitude),
            notes: req.notes,
        }
    }
}

/// Body of `POST /attendance/manual-checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheckOutRequest {
    /// The user whose shift is closed.
    pub user_id: String,
    /// Civil date the forgotten shift started on (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Reason, appended to the record's notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ManualCheckOutRequest> for ManualCheckOut {
    fn from(req: ManualCheckOutRequest) -> Self {
        ManualCheckOut {
            user_id: req.user_id,
            date: req.date,
            notes: req.notes,
        }
    }
}

/// Body of `POST /attendance/manual-record`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRecordRequest {
    /// The user the record belongs to.
    pub user_id: String,
    /// Civil date of the check-in (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Civil check-in time, `HH:MM`.
    pub check_in_time: String,
    /// Civil check-out time, `HH:MM`. Omit to create an open shift.
    #[serde(default)]
    pub check_out_time: Option<String>,
    /// Office the record is tied to. Defaults to `main`.
    #[serde(default)]
    pub office_id: Option<String>,
    /// Free text appended after the manual record label.
    #[serde(default)]
    pub notes: Option<String>,
}

impl TryFrom<ManualRecordRequest> for ManualRecord {
    type Error = EngineError;

    fn try_from(req: ManualRecordRequest) -> EngineResult<Self> {
        let check_in_time = parse_clock("checkInTime", &req.check_in_time)?;
        let check_out_time = req
            .check_out_time
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| parse_clock("checkOutTime", t))
            .transpose()?;

        Ok(ManualRecord {
            user_id: req.user_id,
            date: req.date,
            check_in_time,
            check_out_time,
            office_id: req.office_id,
            notes: req.notes,
        })
    }
}

/// Parses `HH:MM`, also accepting `HH:MM:SS`.
fn parse_clock(field: &str, value: &str) -> EngineResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            EngineError::validation(field, format!("'{}' is not a valid HH:MM time", value))
        })
}

/// Body of `POST /offices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfficeRequest {
    /// Unique office key.
    pub office_id: String,
    /// Display name.
    pub name: String,
    /// Longitude of the geofence centre.
    pub longitude: f64,
    /// Latitude of the geofence centre.
    pub latitude: f64,
    /// Geofence radius in meters. Defaults to 200.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
}

impl From<CreateOfficeRequest> for NewOffice {
    fn from(req: CreateOfficeRequest) -> Self {
        NewOffice {
            office_id: req.office_id,
            name: req.name,
            location: GeoPoint::new(req.longitude, req.latitude),
            radius: req.radius,
            address: req.address,
        }
    }
}

/// Body of `PUT /offices/:officeId`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfficeRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New longitude; must come with `latitude`.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// New latitude; must come with `longitude`.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// New radius in meters.
    #[serde(default)]
    pub radius: Option<f64>,
    /// New street address. An empty string clears it.
    #[serde(default)]
    pub address: Option<String>,
    /// Activates or deactivates the office.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateOfficeRequest> for OfficeUpdate {
    type Error = EngineError;

    fn try_from(req: UpdateOfficeRequest) -> EngineResult<Self> {
        let location = match (req.longitude, req.latitude) {
            (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
            (None, None) => None,
            _ => {
                return Err(EngineError::validation(
                    "coordinates",
                    "longitude and latitude must be updated together",
                ));
            }
        };

        Ok(OfficeUpdate {
            name: req.name,
            location,
            radius: req.radius,
            address: req.address,
            is_active: req.is_active,
        })
    }
}

/// Body of `POST /salary/calculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateSalaryRequest {
    /// The user to compute.
    pub user_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
}

/// A `{month, year}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRef {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
}

/// Body of `PUT /salary/rate/:userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateChangeRequest {
    /// The new hourly rate.
    pub hourly_rate: Decimal,
    /// Recompute this month and every later one up to the current month.
    #[serde(default)]
    pub recompute_from: Option<MonthRef>,
}

/// Body of `PUT /salary/update-month`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMonthRequest {
    /// The user to recompute.
    pub user_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Rate to compute the month with.
    pub hourly_rate: Decimal,
}

/// Body of `POST /salary/adjustments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    /// The user the salary record belongs to.
    pub user_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// `bonus` or `deduction`.
    pub kind: AdjustmentKind,
    /// Positive amount in currency units.
    pub amount: Decimal,
    /// Why the adjustment was made.
    pub reason: String,
}

/// Query of `GET /attendance/:userId`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    /// First civil date, inclusive.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last civil date, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Query of `GET /attendance/all`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllAttendanceQuery {
    /// Restrict to one user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// First civil date, inclusive.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last civil date, inclusive.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Query of `GET /salary/user/:userId`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalaryHistoryQuery {
    /// Restrict to one year.
    #[serde(default)]
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_request_maps_longitude_first() {
        let json = r#"{"userId": "u1", "longitude": 106.66, "latitude": 10.84}"#;
        let req: CheckInRequest = serde_json::from_str(json).unwrap();
        let check_in: CheckIn = req.into();
        assert_eq!(check_in.location, GeoPoint::new(106.66, 10.84));
        assert_eq!(check_in.office_id, None);
    }

    #[test]
    fn test_manual_record_parses_clock_times() {
        let json = r#"{
            "userId": "u1",
            "date": "2025-06-02",
            "checkInTime": "22:00",
            "checkOutTime": "06:00:00"
        }"#;
        let req: ManualRecordRequest = serde_json::from_str(json).unwrap();
        let record = ManualRecord::try_from(req).unwrap();
        assert_eq!(record.check_in_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(
            record.check_out_time,
            Some(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_manual_record_blank_checkout_is_open_shift() {
        let req = ManualRecordRequest {
            user_id: "u1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            check_in_time: "08:00".to_string(),
            check_out_time: Some("  ".to_string()),
            office_id: None,
            notes: None,
        };
        assert_eq!(ManualRecord::try_from(req).unwrap().check_out_time, None);
    }

    #[test]
    fn test_manual_record_rejects_bad_clock() {
        let req = ManualRecordRequest {
            user_id: "u1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            check_in_time: "8am".to_string(),
            check_out_time: None,
            office_id: None,
            notes: None,
        };
        match ManualRecord::try_from(req) {
            Err(EngineError::Validation { field, .. }) => assert_eq!(field, "checkInTime"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_office_update_requires_both_coordinates() {
        let req = UpdateOfficeRequest {
            latitude: Some(10.0),
            ..UpdateOfficeRequest::default()
        };
        assert!(OfficeUpdate::try_from(req).is_err());

        let req = UpdateOfficeRequest {
            longitude: Some(106.0),
            latitude: Some(10.0),
            ..UpdateOfficeRequest::default()
        };
        assert_eq!(
            OfficeUpdate::try_from(req).unwrap().location,
            Some(GeoPoint::new(106.0, 10.0))
        );
    }

    #[test]
    fn test_rate_change_accepts_numeric_rate_and_recompute_month() {
        let json = r#"{"hourlyRate": 45000, "recomputeFrom": {"month": 5, "year": 2025}}"#;
        let req: RateChangeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.hourly_rate, Decimal::new(45_000, 0));
        assert_eq!(req.recompute_from, Some(MonthRef { month: 5, year: 2025 }));
    }

    #[test]
    fn test_adjustment_kind_is_snake_case() {
        let json = r#"{
            "userId": "u1", "month": 6, "year": 2025,
            "kind": "deduction", "amount": "20000", "reason": "Late"
        }"#;
        let req: AdjustmentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.kind, AdjustmentKind::Deduction);
    }
}
