//! Civil-time boundaries.
//!
//! Instants are stored in UTC. Every "day" and "month" boundary is computed by
//! resolving a civil date in the deployment's named timezone and converting
//! back to UTC, so offsets and DST transitions come from the tz database.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{EngineError, EngineResult};

/// Half-open UTC interval `[start, end)` covering one civil month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    /// First instant of the month.
    pub start: DateTime<Utc>,
    /// First instant of the following month.
    pub end: DateTime<Utc>,
}

impl MonthRange {
    /// Returns true if `instant` falls inside the month.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Calendar arithmetic in a single named timezone.
///
/// # Example
///
/// ```
/// use attendance_engine::calculation::CivilCalendar;
/// use chrono::{TimeZone, Utc};
///
/// let calendar = CivilCalendar::from_name("Asia/Ho_Chi_Minh").unwrap();
/// let range = calendar.month_range(6, 2025).unwrap();
/// assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 5, 31, 17, 0, 0).unwrap());
/// assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 6, 30, 17, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilCalendar {
    tz: Tz,
}

impl CivilCalendar {
    /// Creates a calendar for the given timezone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Creates a calendar from an IANA timezone name.
    pub fn from_name(name: &str) -> EngineResult<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|e| EngineError::validation("timezone", e.to_string()))
    }

    /// The underlying timezone.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The civil date on which `instant` falls.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// The civil `(month, year)` in which `instant` falls.
    pub fn month_of(&self, instant: DateTime<Utc>) -> (u32, i32) {
        let local = instant.with_timezone(&self.tz);
        (local.month(), local.year())
    }

    /// `instant` rendered as a civil wall-clock time, `HH:MM`.
    pub fn clock_of(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%H:%M").to_string()
    }

    /// The instant at which civil `date` begins.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.resolve(date.and_time(NaiveTime::MIN))
    }

    /// The last millisecond of civil `date`.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let next = date.succ_opt().unwrap_or(date);
        self.start_of_day(next) - Duration::milliseconds(1)
    }

    /// The instant of civil `date` at wall-clock `time`.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        self.resolve(date.and_time(time))
    }

    /// The UTC range covering civil month `month` of `year`.
    pub fn month_range(&self, month: u32, year: i32) -> EngineResult<MonthRange> {
        let first = first_of_month(month, year)?;
        let (next_month, next_year) = next_month(month, year);
        let next_first = first_of_month(next_month, next_year)?;
        Ok(MonthRange {
            start: self.start_of_day(first),
            end: self.start_of_day(next_first),
        })
    }

    /// Maps a wall-clock time to an instant. Ambiguous times (DST fall-back)
    /// take the earlier instant; nonexistent times (DST spring-forward) move
    /// forward by the size of the gap.
    fn resolve(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                let shifted = local + Duration::hours(1);
                match self.tz.from_local_datetime(&shifted).earliest() {
                    Some(dt) => dt.with_timezone(&Utc),
                    None => Utc.from_utc_datetime(&local),
                }
            }
        }
    }
}

/// Validates a month number and returns the first civil date of that month.
pub fn first_of_month(month: u32, year: i32) -> EngineResult<NaiveDate> {
    if !(1..=12).contains(&month) {
        return Err(EngineError::validation(
            "month",
            "Month must be between 1 and 12",
        ));
    }
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::validation("year", format!("Year {} is out of range", year)))
}

/// The month following `(month, year)`.
pub fn next_month(month: u32, year: i32) -> (u32, i32) {
    if month >= 12 { (1, year + 1) } else { (month + 1, year) }
}

/// Every `(month, year)` from `from` through `to`, inclusive. Empty when
/// `from` is after `to`.
pub fn months_through(from: (u32, i32), to: (u32, i32)) -> Vec<(u32, i32)> {
    let mut months = Vec::new();
    let (mut month, mut year) = from;
    while (year, month) <= (to.1, to.0) {
        months.push((month, year));
        (month, year) = next_month(month, year);
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vietnam() -> CivilCalendar {
        CivilCalendar::from_name("Asia/Ho_Chi_Minh").unwrap()
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        assert!(CivilCalendar::from_name("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn test_date_of_uses_civil_offset() {
        // 18:30 UTC is 01:30 the next day in UTC+7.
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 18, 30, 0).unwrap();
        assert_eq!(
            vietnam().date_of(instant),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
    }

    #[test]
    fn test_month_of_near_boundary() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 30, 17, 30, 0).unwrap();
        assert_eq!(vietnam().month_of(instant), (7, 2025));
    }

    #[test]
    fn test_end_of_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let end = vietnam().end_of_day(date);
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2025, 6, 2, 16, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(vietnam().date_of(end), date);
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let range = vietnam().month_range(12, 2024).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 11, 30, 17, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_month_range_respects_dst() {
        let berlin = CivilCalendar::from_name("Europe/Berlin").unwrap();
        let range = berlin.month_range(3, 2025).unwrap();
        // CET (+1) at the start of March, CEST (+2) at the start of April.
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 2, 28, 23, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 3, 31, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_nonexistent_local_time_moves_forward() {
        let berlin = CivilCalendar::from_name("Europe/Berlin").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let instant = berlin.at(date, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 30, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_month_range_contains_is_half_open() {
        let range = vietnam().month_range(6, 2025).unwrap();
        assert!(range.contains(range.start));
        assert!(!range.contains(range.end));
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        assert!(matches!(
            vietnam().month_range(13, 2025),
            Err(EngineError::Validation { .. })
        ));
        assert!(first_of_month(0, 2025).is_err());
    }

    #[test]
    fn test_months_through_spans_years() {
        assert_eq!(
            months_through((11, 2024), (2, 2025)),
            vec![(11, 2024), (12, 2024), (1, 2025), (2, 2025)]
        );
        assert!(months_through((3, 2025), (2, 2025)).is_empty());
    }
}
