//! Stateful operations built on the calculation layer and the storage traits.
//!
//! - [`OfficeRegistry`] resolves office IDs to geofences and administers offices.
//! - [`AttendanceService`] runs the check-in/check-out state machine.
//! - [`SalaryCalculator`] computes and adjusts monthly salary records.
//! - [`RateChangePropagator`] applies hourly rate changes and bulk recomputes.
//! - [`RecomputeQueue`] refreshes payroll in the background after check-outs.

mod attendance;
mod office_registry;
mod payroll;
mod rate_change;
mod recompute;

pub use attendance::{
    AttendanceEntry, AttendanceService, CheckIn, CheckOut, CheckOutOutcome, DEFAULT_OFFICE_ID,
    ManualCheckOut, ManualRecord,
};
pub use office_registry::{NewOffice, OfficeRegistry, OfficeUpdate};
pub use payroll::{MonthlySalaryReport, MonthlyTotals, SalaryCalculator, SalarySummary};
pub use rate_change::{
    BatchRecomputeReport, FailedMonth, FailedRecompute, RateChangeOutcome, RateChangePropagator,
};
pub use recompute::{FailedJob, RecomputeJob, RecomputeQueue, RecomputeSink};
