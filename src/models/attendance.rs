//! Attendance record model.
//!
//! An [`AttendanceRecord`] is created on check-in and mutated in place on
//! check-out. A record is "open" while its status is [`AttendanceStatus::CheckedIn`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GeoPoint;

/// Lifecycle state of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    /// The shift is open.
    CheckedIn,
    /// The shift is closed; terminal for this record.
    CheckedOut,
}

/// One check-in/check-out pair for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Unique identifier of the record.
    pub id: Uuid,
    /// Opaque user reference.
    pub user_id: String,
    /// When the shift started.
    pub check_in_time: DateTime<Utc>,
    /// When the shift ended, if it has.
    pub check_out_time: Option<DateTime<Utc>>,
    /// Where the user checked in.
    pub check_in_location: GeoPoint,
    /// Where the user checked out, if they have.
    pub check_out_location: Option<GeoPoint>,
    /// Lifecycle state.
    pub status: AttendanceStatus,
    /// Whether the geofence accepted this record (forced true for manual entries).
    pub is_valid: bool,
    /// The office the shift is tied to.
    pub office_id: String,
    /// Worked minutes, populated only once checked out.
    pub work_duration: Option<i64>,
    /// Append-only free text.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Creates an open record checked in at `at`.
    pub fn open(
        user_id: impl Into<String>,
        office_id: impl Into<String>,
        at: DateTime<Utc>,
        location: GeoPoint,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            check_in_time: at,
            check_out_time: None,
            check_in_location: location,
            check_out_location: None,
            status: AttendanceStatus::CheckedIn,
            is_valid: true,
            office_id: office_id.into(),
            work_duration: None,
            notes: notes.filter(|n| !n.trim().is_empty()),
            created_at: at,
            updated_at: at,
        }
    }

    /// Returns true while the shift has not been checked out.
    pub fn is_open(&self) -> bool {
        self.status == AttendanceStatus::CheckedIn
    }

    /// Closes the shift, recording when and where and the worked minutes.
    pub fn close(
        &mut self,
        at: DateTime<Utc>,
        location: Option<GeoPoint>,
        work_duration_minutes: i64,
    ) {
        self.check_out_time = Some(at);
        self.check_out_location = location;
        self.status = AttendanceStatus::CheckedOut;
        self.work_duration = Some(work_duration_minutes);
        self.updated_at = at;
    }

    /// Appends `"<label>: <text>"` to the notes on a new line.
    ///
    /// # Example
    ///
    /// ```
    /// use attendance_engine::models::{AttendanceRecord, GeoPoint};
    /// use chrono::Utc;
    ///
    /// let mut record = AttendanceRecord::open("u1", "main", Utc::now(), GeoPoint::origin(), Some("early".into()));
    /// record.append_note("Check-out", "left on time");
    /// assert_eq!(record.notes.as_deref(), Some("early\nCheck-out: left on time"));
    /// ```
    pub fn append_note(&mut self, label: &str, text: &str) {
        let entry = format!("{}: {}", label, text);
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, entry),
            _ => entry,
        });
    }
}
