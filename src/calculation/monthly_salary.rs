//! Monthly salary aggregation.
//!
//! Turns a month's completed attendance records into daily pay lines and
//! totals at a given hourly rate. Pure and deterministic: the same records
//! and rate always produce the same totals.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{AttendanceRecord, DailyRecord};

use super::civil_time::CivilCalendar;

const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// The derived part of a salary record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySalaryComputation {
    /// Total worked hours, rounded to 2 decimal places.
    pub total_hours: Decimal,
    /// Total pay, rounded to whole currency units.
    pub total_salary: Decimal,
    /// One line per completed record, in check-in order.
    pub daily_records: Vec<DailyRecord>,
}

/// Rounds hours to 2 decimal places, halves away from zero.
pub fn round_hours(hours: Decimal) -> Decimal {
    hours.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an amount to whole currency units, halves away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes the month's pay from completed attendance records.
///
/// Open records are ignored. Totals are accumulated from unrounded per-record
/// values and rounded once at the end, so the total can differ from the sum
/// of the rounded daily lines by a rounding unit.
///
/// # Example
///
/// ```
/// use attendance_engine::calculation::{compute_monthly_salary, CivilCalendar};
/// use attendance_engine::models::{AttendanceRecord, GeoPoint};
/// use chrono::{Duration, TimeZone, Utc};
/// use rust_decimal::Decimal;
///
/// let calendar = CivilCalendar::from_name("Asia/Ho_Chi_Minh").unwrap();
/// let start = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
/// let mut record = AttendanceRecord::open("u1", "main", start, GeoPoint::origin(), None);
/// record.close(start + Duration::hours(6), None, 360);
///
/// let result = compute_monthly_salary(&[record], Decimal::new(50_000, 0), &calendar);
/// assert_eq!(result.total_hours, Decimal::new(6, 0));
/// assert_eq!(result.total_salary, Decimal::new(300_000, 0));
/// ```
pub fn compute_monthly_salary(
    records: &[AttendanceRecord],
    hourly_rate: Decimal,
    calendar: &CivilCalendar,
) -> MonthlySalaryComputation {
    let mut completed: Vec<&AttendanceRecord> = records.iter().filter(|r| !r.is_open()).collect();
    completed.sort_by_key(|r| (r.check_in_time, r.id));

    let mut total_hours = Decimal::ZERO;
    let mut total_salary = Decimal::ZERO;
    let mut daily_records = Vec::with_capacity(completed.len());

    for record in completed {
        let minutes = Decimal::from(record.work_duration.unwrap_or(0));
        let work_hours = minutes / MINUTES_PER_HOUR;
        let daily_salary = work_hours * hourly_rate;

        daily_records.push(DailyRecord {
            date: calendar.date_of(record.check_in_time),
            work_hours: round_hours(work_hours),
            daily_salary: round_currency(daily_salary),
            check_in_time: record.check_in_time,
            check_out_time: record.check_out_time,
            is_valid: record.is_valid,
            notes: record.notes.clone(),
        });

        total_hours += work_hours;
        total_salary += daily_salary;
    }

    MonthlySalaryComputation {
        total_hours: round_hours(total_hours),
        total_salary: round_currency(total_salary),
        daily_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::str::FromStr;

    fn calendar() -> CivilCalendar {
        CivilCalendar::from_name("Asia/Ho_Chi_Minh").unwrap()
    }

    fn completed(start: DateTime<Utc>, minutes: i64) -> AttendanceRecord {
        let mut record = AttendanceRecord::open("u1", "main", start, GeoPoint::origin(), None);
        record.close(start + Duration::minutes(minutes), None, minutes);
        record
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 1, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_month_is_zero() {
        let result = compute_monthly_salary(&[], Decimal::new(50_000, 0), &calendar());
        assert_eq!(result.total_hours, Decimal::ZERO);
        assert_eq!(result.total_salary, Decimal::ZERO);
        assert!(result.daily_records.is_empty());
    }

    #[test]
    fn test_fractional_hours_rounded() {
        // 125 minutes = 2.08333.. hours
        let result =
            compute_monthly_salary(&[completed(day(2), 125)], Decimal::new(30_000, 0), &calendar());
        assert_eq!(result.total_hours, Decimal::from_str("2.08").unwrap());
        assert_eq!(result.total_salary, Decimal::new(62_500, 0));
        assert_eq!(result.daily_records[0].work_hours, Decimal::from_str("2.08").unwrap());
        assert_eq!(result.daily_records[0].daily_salary, Decimal::new(62_500, 0));
    }

    #[test]
    fn test_totals_accumulate_unrounded_values() {
        // Each record: 1 minute at 100/h = 1.666.. -> rounds to 2 per line,
        // but three of them total exactly 5.
        let records = vec![
            completed(day(2), 1),
            completed(day(3), 1),
            completed(day(4), 1),
        ];
        let result = compute_monthly_salary(&records, Decimal::new(100, 0), &calendar());
        assert!(
            result
                .daily_records
                .iter()
                .all(|d| d.daily_salary == Decimal::new(2, 0))
        );
        assert_eq!(result.total_salary, Decimal::new(5, 0));
        assert_eq!(result.total_hours, Decimal::from_str("0.05").unwrap());
    }

    #[test]
    fn test_open_records_are_ignored() {
        let open = AttendanceRecord::open("u1", "main", day(5), GeoPoint::origin(), None);
        let result = compute_monthly_salary(
            &[completed(day(2), 60), open],
            Decimal::new(10_000, 0),
            &calendar(),
        );
        assert_eq!(result.daily_records.len(), 1);
        assert_eq!(result.total_salary, Decimal::new(10_000, 0));
    }

    #[test]
    fn test_daily_records_sorted_by_check_in() {
        let records = vec![completed(day(9), 60), completed(day(3), 60)];
        let result = compute_monthly_salary(&records, Decimal::ONE, &calendar());
        assert!(result.daily_records[0].check_in_time < result.daily_records[1].check_in_time);
    }

    #[test]
    fn test_daily_record_uses_civil_date() {
        // 20:00 UTC on the 2nd is 03:00 on the 3rd in UTC+7.
        let late = Utc.with_ymd_and_hms(2025, 6, 2, 20, 0, 0).unwrap();
        let result = compute_monthly_salary(&[completed(late, 60)], Decimal::ONE, &calendar());
        assert_eq!(
            result.daily_records[0].date,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
        );
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let records = vec![completed(day(2), 125), completed(day(3), 487)];
        let rate = Decimal::from_str("27500.5").unwrap();
        let first = compute_monthly_salary(&records, rate, &calendar());
        let second = compute_monthly_salary(&records, rate, &calendar());
        assert_eq!(first, second);
        assert_eq!(
            first.total_salary.to_string(),
            second.total_salary.to_string()
        );
    }

    #[test]
    fn test_round_currency_half_up() {
        assert_eq!(round_currency(Decimal::from_str("2.5").unwrap()), Decimal::new(3, 0));
        assert_eq!(round_hours(Decimal::from_str("0.125").unwrap()), Decimal::from_str("0.13").unwrap());
    }
}
