//! Visibility rules for tenant-owned rows.
//!
//! Resource types disagree on how wide their read visibility is: most are
//! private to the user that created them, a few are shared across the
//! owner's organization. Each entity declares its policy through
//! [`ScopedResource`] so every query path builds its filter from the same
//! place instead of re-deriving it.

use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition, EntityTrait};

use super::{Environment, Principal};
use crate::entities::users;

/// How far read visibility extends beyond the owning user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePolicy {
    /// Only rows whose owner is the caller.
    OwnerScoped,
    /// Rows owned by any member of the caller's organization.
    OrganizationScoped,
}

/// Implemented by every entity whose rows belong to a user.
pub trait ScopedResource: EntityTrait {
    const POLICY: ScopePolicy;

    /// Column holding the owning user's id.
    fn owner_column() -> Self::Column;

    /// Column holding the environment, for environment-partitioned types.
    fn environment_column() -> Option<Self::Column> {
        None
    }
}

/// Condition selecting the rows `principal` may read.
///
/// `environment` narrows partitioned types to one side of the partition and
/// is ignored for types without an environment column. An
/// organization-scoped read by a principal without an organization falls
/// back to owner-only.
#[must_use]
pub fn visible_to<E: ScopedResource>(
    principal: &Principal,
    environment: Option<Environment>,
) -> Condition {
    let owner = E::owner_column();

    let ownership = match (E::POLICY, principal.organization_id) {
        (ScopePolicy::OrganizationScoped, Some(org_id)) => owner.in_subquery(
            Query::select()
                .column(users::Column::Id)
                .from(users::Entity)
                .and_where(users::Column::OrganizationId.eq(org_id))
                .to_owned(),
        ),
        (ScopePolicy::OrganizationScoped, None) | (ScopePolicy::OwnerScoped, _) => {
            owner.eq(principal.user_id)
        }
    };

    with_environment::<E>(Condition::all().add(ownership), environment)
}

/// Condition selecting the rows `principal` may modify: always owner-only,
/// whatever the read policy.
#[must_use]
pub fn owned_by<E: ScopedResource>(
    principal: &Principal,
    environment: Option<Environment>,
) -> Condition {
    with_environment::<E>(
        Condition::all().add(E::owner_column().eq(principal.user_id)),
        environment,
    )
}

fn with_environment<E: ScopedResource>(
    condition: Condition,
    environment: Option<Environment>,
) -> Condition {
    match (E::environment_column(), environment) {
        (Some(column), Some(env)) => condition.add(column.eq(env)),
        _ => condition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{api_keys, brand_components, email_logs, email_templates, events, integrations};

    #[test]
    fn environment_partitioned_types_are_owner_scoped() {
        assert_eq!(email_templates::Entity::POLICY, ScopePolicy::OwnerScoped);
        assert_eq!(integrations::Entity::POLICY, ScopePolicy::OwnerScoped);
        assert_eq!(events::Entity::POLICY, ScopePolicy::OwnerScoped);
        assert_eq!(api_keys::Entity::POLICY, ScopePolicy::OwnerScoped);
        assert_eq!(email_logs::Entity::POLICY, ScopePolicy::OwnerScoped);
    }

    #[test]
    fn brand_components_are_organization_scoped() {
        assert_eq!(
            brand_components::Entity::POLICY,
            ScopePolicy::OrganizationScoped
        );
        assert!(brand_components::Entity::environment_column().is_none());
    }
}
