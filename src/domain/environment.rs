//! Environment partition and role model.
//!
//! Every environment-scoped resource lives in exactly one [`Environment`].
//! Interactive sessions pick their environment from the `X-Environment`
//! header through [`resolve_environment`]; API-key requests never do.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Principal;

/// Hard partition of otherwise-identical resource types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[sea_orm(string_value = "sandbox")]
    Sandbox,
    #[sea_orm(string_value = "production")]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    /// Parses a client-supplied value. Unknown values yield `None` so callers
    /// decide the fallback explicitly.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Some(Self::Sandbox),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown environment '{s}'"))
    }
}

/// The two roles an organization member can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[default]
    #[sea_orm(string_value = "developer")]
    Developer,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Developer => "developer",
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the environment an interactive request operates in.
///
/// Developers are pinned to sandbox no matter what they ask for. Admins and
/// unauthenticated callers get the requested environment when it is a known
/// value, and sandbox otherwise.
#[must_use]
pub fn resolve_environment(principal: Option<&Principal>, requested: Option<&str>) -> Environment {
    let requested = requested.and_then(Environment::parse);

    match principal.map(|p| p.role) {
        Some(Role::Developer) => Environment::Sandbox,
        Some(Role::Admin) | None => requested.unwrap_or(Environment::Sandbox),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: 1,
            username: "someone".to_string(),
            role,
            organization_id: Some(1),
        }
    }

    #[test]
    fn developer_is_pinned_to_sandbox() {
        let dev = principal(Role::Developer);
        assert_eq!(
            resolve_environment(Some(&dev), Some("production")),
            Environment::Sandbox
        );
        assert_eq!(
            resolve_environment(Some(&dev), Some("sandbox")),
            Environment::Sandbox
        );
        assert_eq!(resolve_environment(Some(&dev), None), Environment::Sandbox);
    }

    #[test]
    fn admin_gets_requested_environment() {
        let admin = principal(Role::Admin);
        assert_eq!(
            resolve_environment(Some(&admin), Some("production")),
            Environment::Production
        );
        assert_eq!(
            resolve_environment(Some(&admin), Some("PRODUCTION")),
            Environment::Production
        );
        assert_eq!(
            resolve_environment(Some(&admin), Some("bogus")),
            Environment::Sandbox
        );
        assert_eq!(resolve_environment(Some(&admin), None), Environment::Sandbox);
    }

    #[test]
    fn anonymous_callers_fall_back_to_sandbox() {
        assert_eq!(
            resolve_environment(None, Some("production")),
            Environment::Production
        );
        assert_eq!(resolve_environment(None, Some("staging")), Environment::Sandbox);
        assert_eq!(resolve_environment(None, None), Environment::Sandbox);
    }

    #[test]
    fn environment_serializes_lowercase() {
        let json = serde_json::to_string(&Environment::Production).unwrap();
        assert_eq!(json, "\"production\"");
        assert_eq!("Sandbox".parse::<Environment>(), Ok(Environment::Sandbox));
    }
}
