//! Geofenced Attendance and Payroll Engine
//!
//! This crate tracks employee attendance through GPS check-ins validated
//! against office geofences, and turns completed shifts into monthly salary
//! records. Calendar days and months are evaluated in a configured civil
//! timezone while every instant is stored in UTC.
//!
//! - [`calculation`]: pure geofence, duration and payroll arithmetic
//! - [`services`]: the attendance state machine, office registry and payroll
//! - [`storage`]: repository traits and the in-memory backend
//! - [`api`]: the axum HTTP surface

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
