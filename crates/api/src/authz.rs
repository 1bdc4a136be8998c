//! API-side authorization guard.
//!
//! Checked at the route boundary, before any service is invoked; the saga
//! services themselves are auth-agnostic.

use stockshift_auth::{authorize, AuthzError, Permission, Principal, Role};

use crate::context::PrincipalContext;

/// Check that the current principal holds `required`.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), AuthzError> {
    let principal = Principal {
        user_id: principal.user_id(),
        username: principal.username().to_string(),
        roles: principal.roles().to_vec(),
        permissions: permissions_from_roles(principal.roles()),
    };

    authorize(&principal, required)
}

/// Static role→permission policy.
///
/// Unknown roles grant nothing.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.contains(&Role::ADMIN) {
        return vec![Permission::WILDCARD];
    }

    let mut permissions = Vec::new();
    for role in roles {
        let granted: &[Permission] = if *role == Role::LOGISTICIAN {
            &[
                Permission::DISTRIBUTION_CALCULATE,
                Permission::SHIPMENTS_READ,
                Permission::WAREHOUSE_STATS_READ,
            ]
        } else if *role == Role::STOREKEEPER {
            &[Permission::WAREHOUSE_STATS_READ, Permission::SUPPLIES_REGISTER]
        } else {
            &[]
        };

        for permission in granted {
            if !permissions.contains(permission) {
                permissions.push(permission.clone());
            }
        }
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockshift_core::UserId;

    fn principal(roles: &[Role]) -> PrincipalContext {
        PrincipalContext::new(UserId::new(7), "olena", roles.to_vec())
    }

    #[test]
    fn admin_is_granted_everything() {
        assert_eq!(permissions_from_roles(&[Role::ADMIN]), vec![Permission::WILDCARD]);
        assert!(authorize_request(&principal(&[Role::ADMIN]), &Permission::WAREHOUSES_ADMIN).is_ok());
    }

    #[test]
    fn overlapping_roles_do_not_duplicate_permissions() {
        let perms = permissions_from_roles(&[Role::LOGISTICIAN, Role::STOREKEEPER]);
        let stats = perms
            .iter()
            .filter(|p| **p == Permission::WAREHOUSE_STATS_READ)
            .count();
        assert_eq!(stats, 1);
        assert!(perms.contains(&Permission::SUPPLIES_REGISTER));
        assert!(perms.contains(&Permission::DISTRIBUTION_CALCULATE));
    }

    #[test]
    fn storekeeper_cannot_trigger_calculations() {
        let err = authorize_request(&principal(&[Role::STOREKEEPER]), &Permission::DISTRIBUTION_CALCULATE)
            .unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("distribution.calculate".to_string()));
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        assert!(permissions_from_roles(&[Role::new("viewer")]).is_empty());
    }
}
