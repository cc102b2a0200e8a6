//! Work duration arithmetic.
//!
//! Durations are whole minutes, rounded half-up from the millisecond
//! difference between check-in and check-out.

use chrono::{DateTime, Utc};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Minutes between `check_in` and `check_out`, rounded half-up.
///
/// # Example
///
/// ```
/// use attendance_engine::calculation::work_duration_minutes;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let check_in = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
/// let check_out = check_in + Duration::minutes(125) + Duration::seconds(29);
/// assert_eq!(work_duration_minutes(check_in, check_out), 125);
/// ```
pub fn work_duration_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let millis = (check_out - check_in).num_milliseconds();
    (millis + MILLIS_PER_MINUTE / 2).div_euclid(MILLIS_PER_MINUTE)
}

/// Formats minutes as `"<h>h<m>m"`, e.g. `125` becomes `"2h5m"`.
pub fn format_work_time(minutes: i64) -> String {
    format!("{}h{}m", minutes.div_euclid(60), minutes.rem_euclid(60))
}

/// Returns true when a shift of `minutes` is longer than `threshold_hours`.
pub fn exceeds_shift_limit(minutes: i64, threshold_hours: u32) -> bool {
    minutes > i64::from(threshold_hours) * 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap()
    }

    #[test]
    fn test_exact_minutes() {
        assert_eq!(
            work_duration_minutes(base(), base() + Duration::minutes(125)),
            125
        );
    }

    #[test]
    fn test_half_minute_rounds_up() {
        let check_out = base() + Duration::minutes(10) + Duration::seconds(30);
        assert_eq!(work_duration_minutes(base(), check_out), 11);
    }

    #[test]
    fn test_just_under_half_minute_rounds_down() {
        let check_out = base() + Duration::minutes(10) + Duration::milliseconds(29_999);
        assert_eq!(work_duration_minutes(base(), check_out), 10);
    }

    #[test]
    fn test_format_work_time() {
        assert_eq!(format_work_time(125), "2h5m");
        assert_eq!(format_work_time(0), "0h0m");
        assert_eq!(format_work_time(60), "1h0m");
        assert_eq!(format_work_time(1_505), "25h5m");
    }

    #[test]
    fn test_shift_limit() {
        assert!(!exceeds_shift_limit(24 * 60, 24));
        assert!(exceeds_shift_limit(24 * 60 + 1, 24));
    }
}
