use serde::{Deserialize, Serialize};

use stockshift_core::UserId;

use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// Built once at the transport boundary from verified claims plus the role
/// policy; services receive the identity explicitly, never from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
