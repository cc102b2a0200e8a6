//! The attendance state machine.
//!
//! A user is either without an open shift or has exactly one. Check-in opens
//! a shift after the geofence accepts the submitted location; check-out closes
//! the most recent open shift against the office it was opened at, however
//! many days ago that was. Administrative backfills bypass the geofence.
//!
//! Every mutating operation for a user runs under that user's lock, and the
//! store additionally refuses a second open shift, so concurrent check-ins
//! cannot both succeed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};

use crate::calculation::{
    CivilCalendar, check_geofence, exceeds_shift_limit, format_work_time, work_duration_minutes,
};
use crate::clock::Clock;
use crate::config::AttendanceSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, GeoPoint, ResolvedOffice};
use crate::storage::{AttendanceFilter, AttendanceStore, UserDirectory};

use super::office_registry::OfficeRegistry;
use super::recompute::{RecomputeJob, RecomputeSink};

/// Office used when a check-in does not name one.
pub const DEFAULT_OFFICE_ID: &str = "main";

const DEFAULT_MANUAL_CHECKOUT_NOTE: &str = "Forgot to check out";
const MANUAL_RECORD_LABEL: &str = "Manual record";

/// A GPS check-in.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    /// The user checking in.
    pub user_id: String,
    /// Submitted position.
    pub location: GeoPoint,
    /// Defaults to [`DEFAULT_OFFICE_ID`].
    pub office_id: Option<String>,
    /// Free text stored on the record.
    pub notes: Option<String>,
}

/// A GPS check-out.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOut {
    /// The user checking out.
    pub user_id: String,
    /// Submitted position.
    pub location: GeoPoint,
    /// Appended to the record's notes.
    pub notes: Option<String>,
}

/// Closes a forgotten shift at the end of its civil day.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCheckOut {
    /// The user whose shift is closed.
    pub user_id: String,
    /// Civil date the open shift started on.
    pub date: NaiveDate,
    /// Reason, defaults to "Forgot to check out".
    pub notes: Option<String>,
}

/// Creates a record directly from civil wall-clock times.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualRecord {
    /// The user the record belongs to.
    pub user_id: String,
    /// Civil date of the check-in.
    pub date: NaiveDate,
    /// Civil check-in time.
    pub check_in_time: NaiveTime,
    /// Earlier than `check_in_time` means the shift ended the next day.
    /// `None` creates an open shift.
    pub check_out_time: Option<NaiveTime>,
    /// Defaults to [`DEFAULT_OFFICE_ID`].
    pub office_id: Option<String>,
    /// Appended after the manual record label.
    pub notes: Option<String>,
}

/// Result of closing a shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutOutcome {
    /// The closed record.
    pub attendance: AttendanceRecord,
    /// Worked minutes.
    pub work_duration: i64,
    /// `"<h>h<m>m"`.
    pub work_time_formatted: String,
    /// Non-fatal anomalies, such as an unusually long shift.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// An attendance record with civil-time display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    /// The stored record.
    #[serde(flatten)]
    pub record: AttendanceRecord,
    /// Only set once checked out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_time_formatted: Option<String>,
    /// Civil date of the check-in.
    pub check_in_date: NaiveDate,
    /// Civil check-in time, `HH:MM`.
    pub check_in_clock: String,
    /// Civil check-out time, `HH:MM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_clock: Option<String>,
}

/// Serialises mutating operations per user.
#[derive(Debug, Default)]
struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    const PRUNE_THRESHOLD: usize = 1024;

    async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() >= Self::PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Check-in, check-out and administrative attendance operations.
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    users: Arc<dyn UserDirectory>,
    offices: Arc<OfficeRegistry>,
    recompute: Arc<dyn RecomputeSink>,
    calendar: CivilCalendar,
    clock: Arc<dyn Clock>,
    settings: AttendanceSettings,
    locks: UserLocks,
}

impl AttendanceService {
    /// Creates the service.
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        users: Arc<dyn UserDirectory>,
        offices: Arc<OfficeRegistry>,
        recompute: Arc<dyn RecomputeSink>,
        calendar: CivilCalendar,
        clock: Arc<dyn Clock>,
        settings: AttendanceSettings,
    ) -> Self {
        Self {
            store,
            users,
            offices,
            recompute,
            calendar,
            clock,
            settings,
            locks: UserLocks::default(),
        }
    }

    /// Opens a shift if the user has none and the location is inside the office geofence.
    pub async fn check_in(&self, request: CheckIn) -> EngineResult<AttendanceRecord> {
        let user_id = require_user_id(&request.user_id)?;
        require_location(request.location)?;
        let office_id = office_or_default(request.office_id.as_deref());

        let _guard = self.locks.acquire(&user_id).await;
        self.require_user(&user_id).await?;

        if self.store.find_open_shift(&user_id).await?.is_some() {
            info!(user_id = %user_id, "Check-in rejected, shift already open");
            return Err(EngineError::DuplicateCheckIn { user_id });
        }

        let office = self.offices.resolve(&office_id).await?;
        self.enforce_geofence(&user_id, request.location, &office)?;

        let record = AttendanceRecord::open(
            user_id,
            office_id,
            self.clock.now(),
            request.location,
            request.notes,
        );
        let record = self.store.create_open_shift(record).await?;

        info!(
            user_id = %record.user_id,
            office_id = %record.office_id,
            attendance_id = %record.id,
            "Checked in"
        );
        Ok(record)
    }

    /// Closes the user's most recent open shift.
    ///
    /// The location is checked against the office the shift was opened at.
    /// Shifts longer than the configured limit still close, with a warning.
    pub async fn check_out(&self, request: CheckOut) -> EngineResult<CheckOutOutcome> {
        let user_id = require_user_id(&request.user_id)?;
        require_location(request.location)?;

        let _guard = self.locks.acquire(&user_id).await;
        let mut record = self
            .store
            .find_open_shift(&user_id)
            .await?
            .ok_or_else(|| EngineError::NoOpenShift {
                user_id: user_id.clone(),
            })?;

        let office = self.offices.resolve(&record.office_id).await?;
        self.enforce_geofence(&user_id, request.location, &office)?;

        let now = self.clock.now();
        let minutes = work_duration_minutes(record.check_in_time, now).max(0);

        let mut warnings = Vec::new();
        if exceeds_shift_limit(minutes, self.settings.long_shift_warning_hours) {
            warn!(
                user_id = %user_id,
                attendance_id = %record.id,
                work_duration = minutes,
                limit_hours = self.settings.long_shift_warning_hours,
                "Unusually long shift closed"
            );
            warnings.push(format!(
                "Shift lasted {}, longer than {} hours",
                format_work_time(minutes),
                self.settings.long_shift_warning_hours
            ));
        }

        record.close(now, Some(request.location), minutes);
        record.is_valid = true;
        if let Some(notes) = non_blank(request.notes.as_deref()) {
            record.append_note("Check-out", notes);
        }
        self.store.update_record(&record).await?;
        self.schedule_recompute(&record);

        info!(
            user_id = %user_id,
            attendance_id = %record.id,
            work_duration = minutes,
            "Checked out"
        );
        Ok(CheckOutOutcome {
            work_time_formatted: format_work_time(minutes),
            work_duration: minutes,
            attendance: record,
            warnings,
        })
    }

    /// Closes the open shift that started on `date` at the last instant of that civil day.
    pub async fn manual_check_out(&self, request: ManualCheckOut) -> EngineResult<CheckOutOutcome> {
        let user_id = require_user_id(&request.user_id)?;

        let _guard = self.locks.acquire(&user_id).await;
        let from = self.calendar.start_of_day(request.date);
        let before = self.calendar.end_of_day(request.date) + Duration::milliseconds(1);
        let mut record = self
            .store
            .find_open_shift_between(&user_id, from, before)
            .await?
            .ok_or_else(|| EngineError::NoOpenShiftForDate {
                user_id: user_id.clone(),
                date: request.date,
            })?;

        let check_out_time = self.calendar.end_of_day(request.date);
        let minutes = work_duration_minutes(record.check_in_time, check_out_time).max(0);

        record.close(check_out_time, None, minutes);
        record.is_valid = true;
        record.updated_at = self.clock.now();
        record.append_note(
            "Manual check-out",
            non_blank(request.notes.as_deref()).unwrap_or(DEFAULT_MANUAL_CHECKOUT_NOTE),
        );
        self.store.update_record(&record).await?;
        self.schedule_recompute(&record);

        info!(
            user_id = %user_id,
            attendance_id = %record.id,
            date = %request.date,
            work_duration = minutes,
            "Manual check-out recorded"
        );
        Ok(CheckOutOutcome {
            work_time_formatted: format_work_time(minutes),
            work_duration: minutes,
            attendance: record,
            warnings: Vec::new(),
        })
    }

    /// Creates a record from civil times without any geofence check.
    pub async fn manual_record(&self, request: ManualRecord) -> EngineResult<AttendanceRecord> {
        let user_id = require_user_id(&request.user_id)?;
        let office_id = office_or_default(request.office_id.as_deref());

        let _guard = self.locks.acquire(&user_id).await;
        self.require_user(&user_id).await?;
        self.offices.resolve(&office_id).await?;

        let check_in = self.calendar.at(request.date, request.check_in_time);
        let notes = match non_blank(request.notes.as_deref()) {
            Some(text) => format!("{}: {}", MANUAL_RECORD_LABEL, text),
            None => MANUAL_RECORD_LABEL.to_string(),
        };
        let mut record =
            AttendanceRecord::open(user_id, office_id, check_in, GeoPoint::origin(), Some(notes));
        let now = self.clock.now();
        record.created_at = now;
        record.updated_at = now;

        let record = match request.check_out_time {
            Some(check_out_clock) => {
                let check_out_date = if check_out_clock < request.check_in_time {
                    request.date.succ_opt().unwrap_or(request.date)
                } else {
                    request.date
                };
                let check_out = self.calendar.at(check_out_date, check_out_clock);
                let minutes = work_duration_minutes(check_in, check_out).max(0);
                record.close(check_out, Some(GeoPoint::origin()), minutes);
                record.updated_at = now;

                let record = self.store.insert_record(record).await?;
                self.schedule_recompute(&record);
                record
            }
            None => self.store.create_open_shift(record).await?,
        };

        info!(
            user_id = %record.user_id,
            attendance_id = %record.id,
            status = ?record.status,
            "Manual attendance record created"
        );
        Ok(record)
    }

    /// A user's records, most recent first, optionally limited to an
    /// inclusive civil date range. The range applies only when both ends are given.
    pub async fn history(
        &self,
        user_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> EngineResult<Vec<AttendanceEntry>> {
        let user_id = require_user_id(user_id)?;
        self.list(Some(user_id), start_date, end_date).await
    }

    /// Records of every user, or of one user, most recent first.
    pub async fn all_attendance(
        &self,
        user_id: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> EngineResult<Vec<AttendanceEntry>> {
        let user_id = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        self.list(user_id, start_date, end_date).await
    }

    async fn list(
        &self,
        user_id: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> EngineResult<Vec<AttendanceEntry>> {
        let mut filter = AttendanceFilter {
            user_id,
            ..AttendanceFilter::default()
        };
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(EngineError::validation(
                    "startDate",
                    "must not be after endDate",
                ));
            }
            filter.checked_in_from = Some(self.calendar.start_of_day(start));
            filter.checked_in_before =
                Some(self.calendar.end_of_day(end) + Duration::milliseconds(1));
        }

        let records = self.store.list_records(&filter).await?;
        Ok(records.into_iter().map(|r| self.enrich(r)).collect())
    }

    fn enrich(&self, record: AttendanceRecord) -> AttendanceEntry {
        AttendanceEntry {
            work_time_formatted: record.work_duration.map(format_work_time),
            check_in_date: self.calendar.date_of(record.check_in_time),
            check_in_clock: self.calendar.clock_of(record.check_in_time),
            check_out_clock: record.check_out_time.map(|t| self.calendar.clock_of(t)),
            record,
        }
    }

    fn enforce_geofence(
        &self,
        user_id: &str,
        location: GeoPoint,
        office: &ResolvedOffice,
    ) -> EngineResult<()> {
        let check = check_geofence(location, office.coordinates, Some(office.radius));
        if check.within_radius {
            return Ok(());
        }

        info!(
            user_id = %user_id,
            office_id = %office.office_id,
            distance_meters = check.distance_meters,
            radius_meters = check.radius_meters,
            "Location outside office geofence"
        );
        Err(EngineError::GeofenceViolation {
            office_id: office.office_id.clone(),
            user_coordinates: location,
            office_coordinates: office.coordinates,
            office_radius: office.radius,
            distance_meters: check.distance_meters,
        })
    }

    fn schedule_recompute(&self, record: &AttendanceRecord) {
        let (month, year) = self.calendar.month_of(record.check_in_time);
        self.recompute.enqueue(RecomputeJob {
            user_id: record.user_id.clone(),
            month,
            year,
        });
    }

    async fn require_user(&self, user_id: &str) -> EngineResult<()> {
        match self.users.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::UserNotFound {
                user_id: user_id.to_string(),
            }),
        }
    }
}

fn require_user_id(user_id: &str) -> EngineResult<String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::validation("userId", "is required"));
    }
    Ok(trimmed.to_string())
}

fn require_location(location: GeoPoint) -> EngineResult<()> {
    if location.is_in_range() {
        Ok(())
    } else {
        Err(EngineError::validation(
            "coordinates",
            format!("{} is not a valid [longitude, latitude] pair", location),
        ))
    }
}

fn office_or_default(office_id: Option<&str>) -> String {
    office_id
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(DEFAULT_OFFICE_ID)
        .to_string()
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
