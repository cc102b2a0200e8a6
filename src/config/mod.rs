//! Configuration loading and management for the attendance engine.
//!
//! This module loads the deployment configuration from YAML files: server and
//! timezone settings, the fallback office table, and seed users. The result is
//! an explicit [`EngineConfig`] value handed to the services at startup.
//!
//! # Example
//!
//! ```no_run
//! use attendance_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap().into_config();
//! println!("Offices in fallback table: {}", config.fallback_offices.len());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AttendanceSettings, EngineConfig, FallbackOffice, GeofenceSettings, OfficesFile,
    PayrollSettings, ServerSettings, SettingsFile, UsersFile,
};
