//! Monthly salary computation and salary record administration.
//!
//! [`SalaryCalculator`] owns every write to salary records. Recomputation
//! replaces the derived totals and daily lines of a record but never touches
//! its bonus and deduction history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calculation::{CivilCalendar, compute_monthly_salary, round_currency, round_hours};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{AdjustmentKind, AttendanceStatus, SalaryAdjustment, SalaryRecord, User};
use crate::storage::{AttendanceFilter, AttendanceStore, SalaryStore, UserDirectory};

/// Headline figures for one salary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalarySummary {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Total worked hours.
    pub total_hours: Decimal,
    /// Pay before adjustments.
    pub total_salary: Decimal,
    /// Pay after adjustments.
    pub final_salary: Decimal,
    /// Number of completed records.
    pub daily_records_count: usize,
    /// Zero when there are no daily records.
    pub average_hours_per_day: Decimal,
    /// Zero when there are no daily records.
    pub average_salary_per_day: Decimal,
}

impl From<&SalaryRecord> for SalarySummary {
    fn from(record: &SalaryRecord) -> Self {
        let count = record.daily_records.len();
        let (average_hours_per_day, average_salary_per_day) = if count == 0 {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let days = Decimal::from(count);
            (
                round_hours(record.total_hours / days),
                round_currency(record.total_salary / days),
            )
        };

        Self {
            month: record.month,
            year: record.year,
            total_hours: record.total_hours,
            total_salary: record.total_salary,
            final_salary: record.final_salary,
            daily_records_count: count,
            average_hours_per_day,
            average_salary_per_day,
        }
    }
}

/// Every salary record of one month with aggregate totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalaryReport {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Records ordered by user ID.
    pub salaries: Vec<SalaryRecord>,
    /// Month-wide totals.
    pub summary: MonthlyTotals,
}

/// Aggregates over a month's salary records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
    /// Number of salary records.
    pub total_employees: usize,
    /// Sum of worked hours.
    pub total_hours: Decimal,
    /// Sum of pay before adjustments.
    pub total_salary: Decimal,
}

/// Where the rate of a recomputed month comes from.
#[derive(Debug, Clone, Copy)]
enum RateSource {
    /// Always this rate.
    Explicit(Decimal),
    /// The rate already stored on the month, else the user's live rate.
    Snapshot { live: Option<Decimal> },
}

/// Computes and persists monthly salary records.
pub struct SalaryCalculator {
    attendance: Arc<dyn AttendanceStore>,
    salaries: Arc<dyn SalaryStore>,
    users: Arc<dyn UserDirectory>,
    calendar: CivilCalendar,
    clock: Arc<dyn Clock>,
}

impl SalaryCalculator {
    /// Creates a calculator over the given stores.
    pub fn new(
        attendance: Arc<dyn AttendanceStore>,
        salaries: Arc<dyn SalaryStore>,
        users: Arc<dyn UserDirectory>,
        calendar: CivilCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attendance,
            salaries,
            users,
            calendar,
            clock,
        }
    }

    /// Recomputes one month of pay for `user_id` at `hourly_rate` and upserts
    /// the record, keeping any existing bonuses and deductions.
    ///
    /// Only checked-out records whose check-in falls in the civil month count.
    /// Running it twice over unchanged attendance yields identical totals.
    pub async fn calculate_monthly_salary(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        hourly_rate: Decimal,
    ) -> EngineResult<SalaryRecord> {
        if hourly_rate.is_sign_negative() {
            return Err(EngineError::validation(
                "hourlyRate",
                "must be a non-negative number",
            ));
        }
        self.write_month(user_id, month, year, RateSource::Explicit(hourly_rate))
            .await
    }

    async fn write_month(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        rate: RateSource,
    ) -> EngineResult<SalaryRecord> {
        let range = self.calendar.month_range(month, year)?;

        let filter = AttendanceFilter {
            user_id: Some(user_id.to_string()),
            checked_in_from: Some(range.start),
            checked_in_before: Some(range.end),
            status: Some(AttendanceStatus::CheckedOut),
        };
        let records = self.attendance.list_records(&filter).await?;

        let calendar = self.calendar;
        let now = self.clock.now();
        let owner = user_id.to_string();
        let saved = self
            .salaries
            .modify_salary(
                user_id,
                month,
                year,
                Box::new(move |existing| {
                    // Picked under the store lock so a concurrent explicit
                    // update is never overwritten with an older snapshot.
                    let hourly_rate = match (rate, existing.as_ref()) {
                        (RateSource::Explicit(rate), _) => rate,
                        (RateSource::Snapshot { .. }, Some(record)) => record.hourly_rate,
                        (RateSource::Snapshot { live: Some(rate) }, None) => rate,
                        (RateSource::Snapshot { live: None }, None) => {
                            return Err(EngineError::UserNotFound { user_id: owner });
                        }
                    };
                    let computation = compute_monthly_salary(&records, hourly_rate, &calendar);

                    let mut record =
                        existing.unwrap_or_else(|| blank_record(owner, month, year, now));
                    record.hourly_rate = hourly_rate;
                    record.total_hours = computation.total_hours;
                    record.total_salary = computation.total_salary;
                    record.daily_records = computation.daily_records;
                    record.updated_at = now;
                    record.refresh_final_salary();
                    Ok(record)
                }),
            )
            .await?;

        debug!(
            user_id = %user_id,
            month,
            year,
            hourly_rate = %saved.hourly_rate,
            total_hours = %saved.total_hours,
            total_salary = %saved.total_salary,
            "Monthly salary computed"
        );
        Ok(saved)
    }

    /// Computes a month at the user's current hourly rate.
    pub async fn calculate_for_user(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<(User, SalaryRecord)> {
        let user = self.require_user(user_id).await?;
        let record = self
            .calculate_monthly_salary(user_id, month, year, user.hourly_rate)
            .await?;
        Ok((user, record))
    }

    /// Refreshes a month after its attendance changed.
    ///
    /// An already computed month keeps the rate it was computed with, so a
    /// later change to the user's rate is not applied retroactively. A month
    /// with no record yet uses the user's current rate.
    pub async fn recompute_for_attendance(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<SalaryRecord> {
        let live = self
            .users
            .get_user(user_id)
            .await?
            .map(|user| user.hourly_rate);
        self.write_month(user_id, month, year, RateSource::Snapshot { live })
            .await
    }

    /// Explicitly recomputes a single month at `hourly_rate`.
    pub async fn update_salary_for_specific_month(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        hourly_rate: Decimal,
    ) -> EngineResult<SalaryRecord> {
        self.require_user(user_id).await?;
        let record = self
            .calculate_monthly_salary(user_id, month, year, hourly_rate)
            .await?;
        info!(
            user_id = %user_id,
            month,
            year,
            hourly_rate = %hourly_rate,
            "Salary month recomputed at explicit rate"
        );
        Ok(record)
    }

    /// Appends a bonus or deduction to an existing record.
    pub async fn add_adjustment(
        &self,
        user_id: &str,
        month: u32,
        year: i32,
        kind: AdjustmentKind,
        amount: Decimal,
        reason: &str,
    ) -> EngineResult<SalaryRecord> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation("amount", "must be greater than zero"));
        }
        if reason.trim().is_empty() {
            return Err(EngineError::validation("reason", "is required"));
        }
        self.calendar.month_range(month, year)?;

        let adjustment = SalaryAdjustment {
            amount,
            reason: reason.trim().to_string(),
            created_at: self.clock.now(),
        };
        let owner = user_id.to_string();
        let record = self
            .salaries
            .modify_salary(
                user_id,
                month,
                year,
                Box::new(move |existing| {
                    let mut record = existing.ok_or(EngineError::SalaryRecordNotFound {
                        user_id: owner,
                        month,
                        year,
                    })?;
                    record.push_adjustment(kind, adjustment);
                    Ok(record)
                }),
            )
            .await?;

        info!(
            user_id = %user_id,
            month,
            year,
            kind = ?kind,
            amount = %amount,
            final_salary = %record.final_salary,
            "Salary adjustment recorded"
        );
        Ok(record)
    }

    /// A user's salary records, newest month first.
    pub async fn salary_history(
        &self,
        user_id: &str,
        year: Option<i32>,
    ) -> EngineResult<Vec<SalaryRecord>> {
        self.salaries.list_salaries_for_user(user_id, year).await
    }

    /// All salary records of a month with totals.
    pub async fn monthly_salaries(&self, month: u32, year: i32) -> EngineResult<MonthlySalaryReport> {
        self.calendar.month_range(month, year)?;
        let salaries = self.salaries.list_salaries_for_month(month, year).await?;

        let total_hours: Decimal = salaries.iter().map(|s| s.total_hours).sum();
        let total_salary: Decimal = salaries.iter().map(|s| s.total_salary).sum();
        let summary = MonthlyTotals {
            total_employees: salaries.len(),
            total_hours: round_hours(total_hours),
            total_salary: round_currency(total_salary),
        };

        Ok(MonthlySalaryReport {
            month,
            year,
            salaries,
            summary,
        })
    }

    /// Users that take part in payroll runs.
    pub async fn payroll_users(&self) -> EngineResult<Vec<User>> {
        let users = self.users.list_users().await?;
        Ok(users.into_iter().filter(|u| !u.is_admin()).collect())
    }

    async fn require_user(&self, user_id: &str) -> EngineResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }
}

fn blank_record(user_id: String, month: u32, year: i32, now: DateTime<Utc>) -> SalaryRecord {
    SalaryRecord {
        id: Uuid::new_v4(),
        user_id,
        month,
        year,
        hourly_rate: Decimal::ZERO,
        total_hours: Decimal::ZERO,
        total_salary: Decimal::ZERO,
        daily_records: Vec::new(),
        bonuses: Vec::new(),
        deductions: Vec::new(),
        final_salary: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    }
}
