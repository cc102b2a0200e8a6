//! Monthly salary record models.
//!
//! A [`SalaryRecord`] is keyed by `(user_id, month, year)`. Recomputation
//! replaces the derived totals and daily lines but keeps the bonus and
//! deduction history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed attendance record as it contributes to a month's pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// Civil date of the check-in.
    pub date: NaiveDate,
    /// Worked hours, rounded to 2 decimal places.
    pub work_hours: Decimal,
    /// Pay for this record, rounded to whole currency units.
    pub daily_salary: Decimal,
    /// Check-in instant.
    pub check_in_time: DateTime<Utc>,
    /// Check-out instant.
    pub check_out_time: Option<DateTime<Utc>>,
    /// Validity flag copied from the attendance record.
    pub is_valid: bool,
    /// Notes copied from the attendance record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Whether an adjustment adds to or subtracts from the final salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Added to the final salary.
    Bonus,
    /// Subtracted from the final salary.
    Deduction,
}

/// A bonus or deduction entry. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryAdjustment {
    /// Amount in currency units, always non-negative.
    pub amount: Decimal,
    /// Why the adjustment was made.
    pub reason: String,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

/// The payroll result for one user and one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    /// Unique identifier, stable across recomputations.
    pub id: Uuid,
    /// The user this record belongs to.
    pub user_id: String,
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Rate used for this computation, not necessarily the user's live rate.
    pub hourly_rate: Decimal,
    /// Total worked hours, rounded to 2 decimal places.
    pub total_hours: Decimal,
    /// Total pay before adjustments, rounded to whole currency units.
    pub total_salary: Decimal,
    /// One entry per completed attendance record in the month.
    pub daily_records: Vec<DailyRecord>,
    /// Bonus history.
    #[serde(default)]
    pub bonuses: Vec<SalaryAdjustment>,
    /// Deduction history.
    #[serde(default)]
    pub deductions: Vec<SalaryAdjustment>,
    /// `total_salary + Σ bonuses − Σ deductions`.
    pub final_salary: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last recomputation or adjustment.
    pub updated_at: DateTime<Utc>,
}

impl SalaryRecord {
    /// Sum of all bonuses.
    pub fn bonus_total(&self) -> Decimal {
        self.bonuses.iter().map(|b| b.amount).sum()
    }

    /// Sum of all deductions.
    pub fn deduction_total(&self) -> Decimal {
        self.deductions.iter().map(|d| d.amount).sum()
    }

    /// Recomputes `final_salary` from the current totals and adjustments.
    pub fn refresh_final_salary(&mut self) {
        self.final_salary = self.total_salary + self.bonus_total() - self.deduction_total();
    }

    /// Appends an adjustment and refreshes the final salary.
    pub fn push_adjustment(&mut self, kind: AdjustmentKind, adjustment: SalaryAdjustment) {
        self.updated_at = adjustment.created_at;
        match kind {
            AdjustmentKind::Bonus => self.bonuses.push(adjustment),
            AdjustmentKind::Deduction => self.deductions.push(adjustment),
        }
        self.refresh_final_salary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn empty_record(total_salary: i64) -> SalaryRecord {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 10, 0, 0).unwrap();
        SalaryRecord {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            month: 6,
            year: 2025,
            hourly_rate: Decimal::new(50_000, 0),
            total_hours: Decimal::new(6, 0),
            total_salary: Decimal::new(total_salary, 0),
            daily_records: vec![],
            bonuses: vec![],
            deductions: vec![],
            final_salary: Decimal::new(total_salary, 0),
            created_at: now,
            updated_at: now,
        }
    }

    fn adjustment(amount: i64, reason: &str) -> SalaryAdjustment {
        SalaryAdjustment {
            amount: Decimal::new(amount, 0),
            reason: reason.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_bonus_and_deduction_adjust_final_salary() {
        let mut record = empty_record(300_000);
        record.push_adjustment(AdjustmentKind::Bonus, adjustment(50_000, "Overtime"));
        record.push_adjustment(AdjustmentKind::Deduction, adjustment(20_000, "Late"));

        assert_eq!(record.final_salary, Decimal::new(330_000, 0));
        assert_eq!(record.bonus_total(), Decimal::new(50_000, 0));
        assert_eq!(record.deduction_total(), Decimal::new(20_000, 0));
    }

    #[test]
    fn test_refresh_uses_new_total() {
        let mut record = empty_record(300_000);
        record.push_adjustment(AdjustmentKind::Bonus, adjustment(50_000, "Overtime"));
        record.total_salary = Decimal::new(400_000, 0);
        record.refresh_final_salary();
        assert_eq!(record.final_salary, Decimal::new(450_000, 0));
    }

    #[test]
    fn test_adjustment_kind_serialization() {
        let kind: AdjustmentKind = serde_json::from_str("\"deduction\"").unwrap();
        assert_eq!(kind, AdjustmentKind::Deduction);
    }
}
