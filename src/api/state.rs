//! Application state for the attendance API.
//!
//! This module wires the services together once at startup and shares them
//! with every request handler.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::services::{
    AttendanceService, OfficeRegistry, RateChangePropagator, RecomputeQueue, SalaryCalculator,
};
use crate::storage::{AttendanceStore, OfficeStore, SalaryStore, UserDirectory};

/// Shared application state.
///
/// Cloning is cheap; every service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    attendance: Arc<AttendanceService>,
    offices: Arc<OfficeRegistry>,
    salaries: Arc<SalaryCalculator>,
    rates: Arc<RateChangePropagator>,
    recompute: Arc<RecomputeQueue>,
}

impl AppState {
    /// Builds every service over one storage backend.
    ///
    /// Starts the background recompute worker, so this must be called from
    /// within a tokio runtime.
    pub fn new<S>(config: &EngineConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: AttendanceStore + SalaryStore + OfficeStore + UserDirectory + 'static,
    {
        let calendar = config.calendar;

        let offices = Arc::new(OfficeRegistry::new(
            store.clone(),
            config.fallback_offices.clone(),
            config.geofence.default_radius_meters,
            clock.clone(),
        ));
        let salaries = Arc::new(SalaryCalculator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            calendar,
            clock.clone(),
        ));
        let recompute = Arc::new(RecomputeQueue::start(salaries.clone(), &config.payroll));
        let attendance = Arc::new(AttendanceService::new(
            store.clone(),
            store.clone(),
            offices.clone(),
            recompute.clone(),
            calendar,
            clock.clone(),
            config.attendance.clone(),
        ));
        let rates = Arc::new(RateChangePropagator::new(
            store,
            salaries.clone(),
            calendar,
            clock,
        ));

        Self {
            attendance,
            offices,
            salaries,
            rates,
            recompute,
        }
    }

    /// Returns the attendance state machine.
    pub fn attendance(&self) -> &AttendanceService {
        &self.attendance
    }

    /// Returns the office registry.
    pub fn offices(&self) -> &OfficeRegistry {
        &self.offices
    }

    /// Returns the salary calculator.
    pub fn salaries(&self) -> &SalaryCalculator {
        &self.salaries
    }

    /// Returns the rate change propagator.
    pub fn rates(&self) -> &RateChangePropagator {
        &self.rates
    }

    /// Returns the background recompute queue.
    pub fn recompute_queue(&self) -> &RecomputeQueue {
        &self.recompute
    }
}
