use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "distribution.calculate"). The wildcard
/// `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    pub const DISTRIBUTION_CALCULATE: Permission =
        Permission(Cow::Borrowed("distribution.calculate"));
    pub const SHIPMENTS_READ: Permission = Permission(Cow::Borrowed("distribution.shipments.read"));
    pub const WAREHOUSE_STATS_READ: Permission = Permission(Cow::Borrowed("warehouses.stats.read"));
    pub const WAREHOUSES_ADMIN: Permission = Permission(Cow::Borrowed("warehouses.admin"));
    pub const PRODUCTS_ADMIN: Permission = Permission(Cow::Borrowed("products.admin"));
    pub const SUPPLIES_REGISTER: Permission = Permission(Cow::Borrowed("supplies.register"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
