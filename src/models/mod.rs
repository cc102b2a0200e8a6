//! Core data models for the attendance engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod geo;
mod office;
mod salary;
mod user;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use geo::GeoPoint;
pub use office::{DEFAULT_OFFICE_RADIUS_METERS, Office, OfficeSource, ResolvedOffice};
pub use salary::{AdjustmentKind, DailyRecord, SalaryAdjustment, SalaryRecord};
pub use user::{Role, User};
