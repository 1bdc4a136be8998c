use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; the API policy maps them to
/// permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Full access, including warehouse administration.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Plans redistribution: triggers calculations, reads shipments and stats.
    pub const LOGISTICIAN: Role = Role(Cow::Borrowed("logistician"));
    /// Operates a warehouse floor: registers inbound supplies, reads capacity stats.
    pub const STOREKEEPER: Role = Role(Cow::Borrowed("storekeeper"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
