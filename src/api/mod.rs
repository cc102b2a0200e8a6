//! HTTP API module for the attendance engine.
//!
//! This module provides the REST endpoints for GPS check-in/check-out,
//! administrative attendance fixes, office administration and payroll.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    AdjustmentRequest, CalculateSalaryRequest, CheckInRequest, CheckOutRequest,
    CreateOfficeRequest, ManualCheckOutRequest, ManualRecordRequest, MonthRef,
    RateChangeRequest, UpdateMonthRequest, UpdateOfficeRequest,
};
pub use response::{ApiError, ApiErrorResponse, GeofenceFailure};
pub use state::AppState;
