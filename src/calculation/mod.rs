//! Calculation logic for the attendance engine.
//!
//! This module contains the pure arithmetic the services build on: haversine
//! geofence checks, work duration rounding and formatting, civil-time day and
//! month boundaries, and monthly salary aggregation. Nothing here performs I/O.

mod civil_time;
mod geofence;
mod monthly_salary;
mod work_duration;

pub use civil_time::{CivilCalendar, MonthRange, first_of_month, months_through, next_month};
pub use geofence::{
    DEFAULT_MAX_DISTANCE_METERS, EARTH_RADIUS_METERS, GeofenceCheck, calculate_distance,
    check_geofence, is_within_radius,
};
pub use monthly_salary::{
    MonthlySalaryComputation, compute_monthly_salary, round_currency, round_hours,
};
pub use work_duration::{exceeds_shift_limit, format_work_time, work_duration_minutes};
