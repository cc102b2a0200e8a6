//! User model as consumed by the payroll core.
//!
//! Users are owned by an external directory; the engine only reads their role
//! and hourly rate, and writes the rate on an explicit rate change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Access role of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Administrators are excluded from bulk payroll runs.
    Admin,
    /// Regular staff.
    #[default]
    Staff,
    /// Read-only user.
    Viewer,
}

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Access role.
    #[serde(default)]
    pub role: Role,
    /// Current hourly rate. Past salary records keep their own snapshot.
    #[serde(default)]
    pub hourly_rate: Decimal,
}

impl User {
    /// Returns true for administrators.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults_role_to_staff() {
        let json = r#"{
            "id": "u1",
            "name": "Lan",
            "username": "lan",
            "hourlyRate": "25000"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.hourly_rate, Decimal::new(25000, 0));
        assert!(!user.is_admin());
    }

    #[test]
    fn test_admin_role() {
        let json = r#"{"id": "a1", "name": "Root", "username": "root", "role": "admin"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.is_admin());
        assert_eq!(user.hourly_rate, Decimal::ZERO);
    }
}
