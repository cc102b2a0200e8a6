//! Persistence for attendance, salary, office, and user data.
//!
//! Services depend on the traits in this module, never on a concrete backend.
//! [`MemoryStore`] implements all of them in process memory.

mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::{
    AttendanceFilter, AttendanceStore, OfficeStore, SalaryMutation, SalaryStore, UserDirectory,
};
