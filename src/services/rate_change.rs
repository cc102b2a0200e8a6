//! Hourly rate changes and bulk payroll runs.
//!
//! Rate changes are forward-only: updating a user's rate leaves every
//! existing salary record untouched, and only months computed afterwards use
//! the new rate. Rewriting past months requires either an explicit
//! `recompute_from` month on the rate change or a single-month update through
//! [`SalaryCalculator::update_salary_for_specific_month`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use crate::calculation::{CivilCalendar, first_of_month, months_through};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::models::{SalaryRecord, User};
use crate::storage::UserDirectory;

use super::payroll::SalaryCalculator;

/// Result of changing a user's rate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateChangeOutcome {
    /// The user with the new rate applied.
    pub user: User,
    /// Rate before the change.
    pub previous_rate: Decimal,
    /// Months rewritten at the new rate, oldest first. Empty unless a
    /// recompute was requested.
    pub recomputed: Vec<SalaryRecord>,
    /// Requested months that could not be rewritten. The rate change itself
    /// still applies.
    pub failed: Vec<FailedMonth>,
}

/// A month a retroactive recompute could not rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMonth {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Why it failed.
    pub error: String,
}

/// A user a bulk run could not compute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecompute {
    /// The user that failed.
    pub user_id: String,
    /// Why it failed.
    pub error: String,
}

/// Result of recomputing every payroll user for one month.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecomputeReport {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Users whose record was written.
    pub recalculated: Vec<String>,
    /// Users whose computation failed.
    pub failed: Vec<FailedRecompute>,
}

/// Applies rate changes and runs month-wide recomputes.
pub struct RateChangePropagator {
    users: Arc<dyn UserDirectory>,
    calculator: Arc<SalaryCalculator>,
    calendar: CivilCalendar,
    clock: Arc<dyn Clock>,
}

impl RateChangePropagator {
    /// Creates the propagator.
    pub fn new(
        users: Arc<dyn UserDirectory>,
        calculator: Arc<SalaryCalculator>,
        calendar: CivilCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            calculator,
            calendar,
            clock,
        }
    }

    /// Sets the user's live rate.
    ///
    /// With `recompute_from` set, every month from it through the current
    /// civil month is recomputed at the new rate; bonuses and deductions are
    /// kept. Without it no salary record changes. A month that fails to
    /// recompute is reported in the outcome and the remaining months still run.
    pub async fn on_rate_changed(
        &self,
        user_id: &str,
        new_rate: Decimal,
        recompute_from: Option<(u32, i32)>,
    ) -> EngineResult<RateChangeOutcome> {
        if new_rate.is_sign_negative() {
            return Err(EngineError::validation(
                "hourlyRate",
                "must be a non-negative number",
            ));
        }

        let current_month = self.calendar.month_of(self.clock.now());
        let months = match recompute_from {
            Some((month, year)) => {
                first_of_month(month, year)?;
                if (year, month) > (current_month.1, current_month.0) {
                    return Err(EngineError::validation(
                        "recomputeFrom",
                        "must not be after the current month",
                    ));
                }
                months_through((month, year), current_month)
            }
            None => Vec::new(),
        };

        let previous_rate = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                user_id: user_id.to_string(),
            })?
            .hourly_rate;
        let user = self.users.set_hourly_rate(user_id, new_rate).await?;

        let mut recomputed = Vec::with_capacity(months.len());
        let mut failed = Vec::new();
        for (month, year) in months {
            match self
                .calculator
                .calculate_monthly_salary(user_id, month, year, new_rate)
                .await
            {
                Ok(record) => recomputed.push(record),
                Err(err) => {
                    error!(
                        user_id = %user_id,
                        month,
                        year,
                        error = %err,
                        "Retroactive salary recompute failed"
                    );
                    failed.push(FailedMonth {
                        month,
                        year,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            user_id = %user_id,
            previous_rate = %previous_rate,
            new_rate = %new_rate,
            recomputed_months = recomputed.len(),
            failed_months = failed.len(),
            "Hourly rate changed"
        );
        Ok(RateChangeOutcome {
            user,
            previous_rate,
            recomputed,
            failed,
        })
    }

    /// Recomputes `month` for every non-admin user at their current rate.
    ///
    /// A failure for one user is logged and reported; the run continues.
    pub async fn recalculate_all_salaries_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> EngineResult<BatchRecomputeReport> {
        first_of_month(month, year)?;
        let users = self.calculator.payroll_users().await?;

        let mut report = BatchRecomputeReport {
            month,
            year,
            recalculated: Vec::with_capacity(users.len()),
            failed: Vec::new(),
        };
        for user in users {
            match self
                .calculator
                .calculate_monthly_salary(&user.id, month, year, user.hourly_rate)
                .await
            {
                Ok(_) => report.recalculated.push(user.id),
                Err(err) => {
                    error!(
                        user_id = %user.id,
                        month,
                        year,
                        error = %err,
                        "Salary recompute failed in bulk run"
                    );
                    report.failed.push(FailedRecompute {
                        user_id: user.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            month,
            year,
            recalculated = report.recalculated.len(),
            failed = report.failed.len(),
            "Bulk salary recompute finished"
        );
        Ok(report)
    }
}
