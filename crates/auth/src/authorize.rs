//! The authorization gate.
//!
//! Every mutating or sensitive operation calls [`authorize`] before any
//! business logic runs:
//!
//! 1. no identity → `Unauthorized`
//! 2. persisted account inactive → `Suspended`
//! 3. role outside the operation's requirement → `Forbidden`
//!
//! The gate is a pure function over already-loaded data; it performs no IO.

use serde::Serialize;
use thiserror::Error;

use tukangin_core::UserId;

use crate::{Identity, Role, UserAccount};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Unauthorized")]
    Unauthorized,

    /// Callers match on the word "suspended" in this message.
    #[error("Your account has been suspended")]
    Suspended,

    #[error("Forbidden: requires one of {0}")]
    Forbidden(String),
}

/// Roles allowed to perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement(&'static [Role]);

impl RoleRequirement {
    /// Any active account.
    pub const ANY: RoleRequirement = RoleRequirement(&[]);

    /// Admin dashboard operations.
    pub const ADMIN: RoleRequirement = RoleRequirement(&[Role::Admin, Role::Developer]);

    pub const fn one_of(roles: &'static [Role]) -> Self {
        Self(roles)
    }

    pub fn allows(&self, role: Role) -> bool {
        self.0.is_empty() || self.0.contains(&role)
    }

    fn describe(&self) -> String {
        self.0.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Outcome of a successful gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizedUser {
    pub user_id: UserId,
    pub role: Role,
}

/// Check identity, suspension and role, in that order.
///
/// `account` is the persisted record for `identity.user_id`; a missing
/// record means the identity is unknown to the system.
pub fn authorize(
    identity: Option<&Identity>,
    account: Option<&UserAccount>,
    requirement: RoleRequirement,
) -> Result<AuthorizedUser, AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthorized)?;

    let account = match account {
        Some(a) if a.id == identity.user_id => a,
        _ => return Err(AuthzError::Unauthorized),
    };

    if !account.is_active {
        return Err(AuthzError::Suspended);
    }

    if !requirement.allows(account.role) {
        return Err(AuthzError::Forbidden(requirement.describe()));
    }

    Ok(AuthorizedUser {
        user_id: account.id,
        role: account.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account_for(identity: &Identity, role: Role, is_active: bool) -> UserAccount {
        let mut account = UserAccount::provision(identity, Utc::now());
        account.role = role;
        account.is_active = is_active;
        account
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        assert_eq!(
            authorize(None, None, RoleRequirement::ANY),
            Err(AuthzError::Unauthorized)
        );
    }

    #[test]
    fn unknown_account_is_unauthorized() {
        let identity = Identity::new(UserId::new());
        let other = account_for(&Identity::new(UserId::new()), Role::Admin, true);

        assert_eq!(
            authorize(Some(&identity), None, RoleRequirement::ANY),
            Err(AuthzError::Unauthorized)
        );
        assert_eq!(
            authorize(Some(&identity), Some(&other), RoleRequirement::ANY),
            Err(AuthzError::Unauthorized)
        );
    }

    #[test]
    fn suspension_wins_over_role() {
        let identity = Identity::new(UserId::new());
        let account = account_for(&identity, Role::Admin, false);

        let err = authorize(Some(&identity), Some(&account), RoleRequirement::ADMIN).unwrap_err();
        assert_eq!(err, AuthzError::Suspended);
        assert!(err.to_string().to_lowercase().contains("suspended"));
    }

    #[test]
    fn customers_are_forbidden_from_admin_operations() {
        let identity = Identity::new(UserId::new());
        let account = account_for(&identity, Role::Customer, true);

        match authorize(Some(&identity), Some(&account), RoleRequirement::ADMIN) {
            Err(AuthzError::Forbidden(roles)) => assert_eq!(roles, "ADMIN, DEVELOPER"),
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[test]
    fn developers_pass_admin_requirement() {
        let identity = Identity::new(UserId::new());
        let account = account_for(&identity, Role::Developer, true);

        let authorized = authorize(Some(&identity), Some(&account), RoleRequirement::ADMIN).unwrap();
        assert_eq!(authorized.user_id, identity.user_id);
        assert_eq!(authorized.role, Role::Developer);
    }
}
