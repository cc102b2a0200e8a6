//! Storage traits.
//!
//! These traits abstract the persistence layer so the services work the same
//! against the in-memory backend or a database-backed one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{AttendanceRecord, AttendanceStatus, Office, SalaryRecord, User};

/// Filter for attendance queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    /// Only records for this user.
    pub user_id: Option<String>,
    /// Only records with `check_in_time >= checked_in_from`.
    pub checked_in_from: Option<DateTime<Utc>>,
    /// Only records with `check_in_time < checked_in_before`.
    pub checked_in_before: Option<DateTime<Utc>>,
    /// Only records in this state.
    pub status: Option<AttendanceStatus>,
}

impl AttendanceFilter {
    /// Matches everything for `user_id`.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Returns true if `record` satisfies every set criterion.
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.user_id.as_deref().is_none_or(|u| record.user_id == u)
            && self.checked_in_from.is_none_or(|from| record.check_in_time >= from)
            && self
                .checked_in_before
                .is_none_or(|before| record.check_in_time < before)
            && self.status.is_none_or(|s| record.status == s)
    }
}

/// Read-modify-write step applied to a salary record under the store's lock.
///
/// Receives the existing record, if any, and returns the record to persist.
pub type SalaryMutation =
    Box<dyn FnOnce(Option<SalaryRecord>) -> EngineResult<SalaryRecord> + Send>;

/// Attendance record persistence.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts an open record, failing with `DuplicateCheckIn` if the user
    /// already has one. The check and the insert are a single atomic step.
    async fn create_open_shift(&self, record: AttendanceRecord) -> EngineResult<AttendanceRecord>;

    /// Inserts a record as-is. Open records still go through the
    /// one-open-shift check.
    async fn insert_record(&self, record: AttendanceRecord) -> EngineResult<AttendanceRecord>;

    /// The user's most recent open record, regardless of its date.
    async fn find_open_shift(&self, user_id: &str) -> EngineResult<Option<AttendanceRecord>>;

    /// The user's most recent open record checked in within `[from, before)`.
    async fn find_open_shift_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> EngineResult<Option<AttendanceRecord>>;

    /// Replaces a stored record by ID.
    async fn update_record(&self, record: &AttendanceRecord) -> EngineResult<()>;

    /// Records matching `filter`, most recent check-in first.
    async fn list_records(&self, filter: &AttendanceFilter) -> EngineResult<Vec<AttendanceRecord>>;
}

/// Salary record persistence, keyed by `(user_id, month, year)`.
#[async_trait]
pub trait SalaryStore: Send + Sync {
    /// The record for one user and month.
    async fn find_salary(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<Option<SalaryRecord>>;

    /// Atomically applies `mutation` to the record for the key and stores the result.
    async fn modify_salary(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        mutation: SalaryMutation,
    ) -> EngineResult<SalaryRecord>;

    /// A user's records, newest month first, optionally limited to one year.
    async fn list_salaries_for_user(
        &self,
        user_id: &str,
        year: Option<i32>,
    ) -> EngineResult<Vec<SalaryRecord>>;

    /// Every user's record for one month, ordered by user ID.
    async fn list_salaries_for_month(&self, month: u32, year: i32)
    -> EngineResult<Vec<SalaryRecord>>;
}

/// Persisted office administration.
#[async_trait]
pub trait OfficeStore: Send + Sync {
    /// The office with this ID, active or not.
    async fn get_office(&self, office_id: &str) -> EngineResult<Option<Office>>;

    /// All offices ordered by ID.
    async fn list_offices(&self) -> EngineResult<Vec<Office>>;

    /// Inserts a new office, failing with `OfficeAlreadyExists` on a duplicate ID.
    async fn insert_office(&self, office: Office) -> EngineResult<Office>;

    /// Replaces an office, failing with `OfficeNotFound` if absent.
    async fn update_office(&self, office: Office) -> EngineResult<Office>;

    /// Removes an office, failing with `OfficeNotFound` if absent.
    async fn delete_office(&self, office_id: &str) -> EngineResult<()>;
}

/// The external user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The user with this ID.
    async fn get_user(&self, user_id: &str) -> EngineResult<Option<User>>;

    /// All users ordered by name.
    async fn list_users(&self) -> EngineResult<Vec<User>>;

    /// Sets the user's live hourly rate, failing with `UserNotFound` if absent.
    async fn set_hourly_rate(&self, user_id: &str, hourly_rate: Decimal) -> EngineResult<User>;
}
