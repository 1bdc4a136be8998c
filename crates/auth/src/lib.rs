//! `stockshift-auth`: authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer validates a bearer token,
//! builds a [`Principal`] and checks permissions before invoking a service.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
