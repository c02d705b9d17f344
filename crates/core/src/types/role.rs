//! User roles as reported by the catalog service.

use serde::{Deserialize, Serialize};

/// Role attached to a user profile.
///
/// The catalog service only ever reports `customer` or `admin` today;
/// anything else deserializes as [`Role::Unknown`] rather than failing the
/// whole profile payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_roles_roundtrip() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");

        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_unrecognized_role_degrades() {
        let role: Role = serde_json::from_str("\"superuser\"").unwrap();
        assert_eq!(role, Role::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::Customer.to_string(), "customer");
    }
}
