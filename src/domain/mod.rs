//! Domain primitives shared by the service and HTTP layers.
//!
//! The environment partition, the authenticated principal, the resource
//! scoping policies and slug derivation live here. Nothing in this module
//! talks to the database directly except through the query conditions that
//! [`scope`] builds.

pub mod environment;
pub mod principal;
pub mod scope;
pub mod slug;

pub use environment::{Environment, Role, resolve_environment};
pub use principal::Principal;
pub use scope::{ScopePolicy, ScopedResource};
pub use slug::slugify;

use serde::Serialize;
use std::fmt;

/// Result of a promotion: whether the production counterpart was inserted
/// or overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionOutcome {
    Created,
    Updated,
}

impl PromotionOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for PromotionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment-partitioned resource types that can be promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotableKind {
    Template,
    Integration,
    Event,
}

impl PromotableKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Integration => "integration",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for PromotableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
