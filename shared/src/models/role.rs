//! Role Model
//!
//! Marketplace roles form a closed set. Anything else arriving on the wire is
//! decoded as "no role", which every consumer treats as unauthorized.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marketplace role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
    Customer,
}

impl Role {
    /// Every known role
    pub const ALL: [Role; 3] = [Role::Admin, Role::Seller, Role::Customer];

    /// Wire representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Customer => "customer",
        }
    }

    /// Route a user of this role lands on after authenticating
    pub const fn landing_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Seller => "/seller/dashboard",
            Role::Customer => "/",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string outside the closed set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "seller" => Ok(Role::Seller),
            "customer" => Ok(Role::Customer),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Decode an optional role, mapping unrecognized values to `None`.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, "Unrecognized role, treating as unauthorized");
            None
        }
    }))
}

/// Something a role can be checked against: one role or a set of roles.
pub trait RoleQuery {
    fn matches(&self, role: Role) -> bool;
}

impl RoleQuery for Role {
    fn matches(&self, role: Role) -> bool {
        *self == role
    }
}

impl RoleQuery for [Role] {
    fn matches(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<const N: usize> RoleQuery for [Role; N] {
    fn matches(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl RoleQuery for Vec<Role> {
    fn matches(&self, role: Role) -> bool {
        self.contains(&role)
    }
}

impl<T: RoleQuery + ?Sized> RoleQuery for &T {
    fn matches(&self, role: Role) -> bool {
        (**self).matches(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_lenient")]
        role: Option<Role>,
    }

    #[test]
    fn test_parse_roles() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Seller ".parse::<Role>(), Ok(Role::Seller));
        assert_eq!("customer".parse::<Role>(), Ok(Role::Customer));
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(UnknownRole("superuser".to_string()))
        );
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_lenient_decoding() {
        let h: Holder = serde_json::from_str(r#"{"role":"customer"}"#).unwrap();
        assert_eq!(h.role, Some(Role::Customer));

        let h: Holder = serde_json::from_str(r#"{"role":"moderator"}"#).unwrap();
        assert_eq!(h.role, None);

        let h: Holder = serde_json::from_str(r#"{"role":null}"#).unwrap();
        assert_eq!(h.role, None);

        let h: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(h.role, None);
    }

    #[test]
    fn test_role_query() {
        assert!(Role::Admin.matches(Role::Admin));
        assert!(!Role::Admin.matches(Role::Seller));
        assert!([Role::Admin, Role::Seller].matches(Role::Seller));
        assert!(!vec![Role::Customer].matches(Role::Admin));

        let roles: &[Role] = &[Role::Seller];
        assert!(roles.matches(Role::Seller));
        assert!(!(&[] as &[Role]).matches(Role::Customer));
    }

    #[test]
    fn test_landing_routes() {
        assert_eq!(Role::Admin.landing_route(), "/admin/dashboard");
        assert_eq!(Role::Seller.landing_route(), "/seller/dashboard");
        assert_eq!(Role::Customer.landing_route(), "/");
    }
}
