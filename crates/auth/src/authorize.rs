use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - Pure policy check
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains(Permission::WILDCARD.as_str()) || perms.contains(required.as_str()) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            permission = required.as_str(),
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockshift_core::UserId;

    use crate::Role;

    fn principal(permissions: Vec<Permission>) -> Principal {
        Principal {
            user_id: UserId::new(3),
            username: "kim".to_string(),
            roles: vec![Role::LOGISTICIAN],
            permissions,
        }
    }

    #[test]
    fn explicit_permission_is_granted() {
        let p = principal(vec![Permission::DISTRIBUTION_CALCULATE]);
        assert_eq!(authorize(&p, &Permission::DISTRIBUTION_CALCULATE), Ok(()));
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(vec![Permission::WILDCARD]);
        assert_eq!(authorize(&p, &Permission::WAREHOUSES_ADMIN), Ok(()));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(vec![Permission::WAREHOUSE_STATS_READ]);
        assert_eq!(
            authorize(&p, &Permission::DISTRIBUTION_CALCULATE),
            Err(AuthzError::Forbidden("distribution.calculate".to_string()))
        );
    }
}
