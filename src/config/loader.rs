//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from a directory of YAML files.

use std::fs;
use std::path::Path;

use crate::calculation::CivilCalendar;
use crate::error::{EngineError, EngineResult};
use super::types::{EngineConfig, OfficesFile, SettingsFile, UsersFile};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── settings.yaml   # Server, timezone, geofence, payroll retry settings
/// ├── offices.yaml    # Fallback office table, coordinates as [longitude, latitude]
/// └── users.yaml      # Optional seed users for the directory
/// ```
///
/// # Example
///
/// ```no_run
/// use attendance_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Timezone: {}", loader.config().calendar.timezone());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `settings.yaml` or `offices.yaml` is missing, if any
    /// file contains invalid YAML, if the timezone is unknown, or if a fallback
    /// office has coordinates outside the valid longitude/latitude ranges
    /// (which usually means they were written `[latitude, longitude]`).
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings_path = path.join("settings.yaml");
        let settings = Self::load_yaml::<SettingsFile>(&settings_path)?;

        let offices_path = path.join("offices.yaml");
        let offices = Self::load_yaml::<OfficesFile>(&offices_path)?;

        let users_path = path.join("users.yaml");
        let users = if users_path.exists() {
            Self::load_yaml::<UsersFile>(&users_path)?
        } else {
            UsersFile::default()
        };

        let calendar = CivilCalendar::from_name(&settings.timezone).map_err(|_| {
            EngineError::ConfigParseError {
                path: settings_path.display().to_string(),
                message: format!("unknown timezone '{}'", settings.timezone),
            }
        })?;

        for (office_id, office) in &offices.offices {
            if !office.coordinates.is_in_range() {
                return Err(EngineError::ConfigParseError {
                    path: offices_path.display().to_string(),
                    message: format!(
                        "office '{}' has coordinates {} outside [longitude, latitude] range",
                        office_id, office.coordinates
                    ),
                });
            }
        }

        let config = EngineConfig {
            server: settings.server,
            calendar,
            geofence: settings.geofence,
            attendance: settings.attendance,
            payroll: settings.payroll,
            fallback_offices: offices.offices,
            seed_users: users.users,
        };

        Ok(Self { config })
    }

    /// Wraps an already assembled configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> EngineConfig {
        self.config
    }
}
