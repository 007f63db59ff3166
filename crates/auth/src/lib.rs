//! `tukangin-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: callers resolve an
//! [`Identity`] and load the persisted [`UserAccount`], then ask the gate.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod jwt;
pub mod roles;
pub mod user;

pub use authorize::{AuthorizedUser, AuthzError, RoleRequirement, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::Identity;
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use roles::Role;
pub use user::UserAccount;
