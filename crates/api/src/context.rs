use stockshift_auth::Role;
use stockshift_core::UserId;
use stockshift_distribution::Initiator;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware; handlers pass the identity on explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    username: String,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// The acting identity stamped onto outbound calculation requests.
    pub fn initiator(&self) -> Initiator {
        Initiator::new(self.user_id, self.username.clone())
    }
}
