use serde::Serialize;

use super::Role;
use crate::entities::users;

/// The authenticated caller of a request, whether it arrived through a
/// session cookie or an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: i32,
    pub username: String,
    pub role: Role,
    pub organization_id: Option<i32>,
}

impl Principal {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Only the owner of a row may change it.
    #[must_use]
    pub const fn owns(&self, owner_id: i32) -> bool {
        self.user_id == owner_id
    }
}

impl From<&users::Model> for Principal {
    fn from(user: &users::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            organization_id: user.organization_id,
        }
    }
}
