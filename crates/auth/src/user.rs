//! User accounts and the suspension lifecycle.
//!
//! # Invariants
//! - An inactive (suspended) account is rejected by every mutating operation,
//!   regardless of role.
//! - Administrators cannot suspend themselves or change their own role.
//! - Accounts are never hard-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tukangin_core::{DomainError, Entity, UserId};

use crate::{Identity, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl UserAccount {
    /// Account created on first sign-in: an active customer.
    pub fn provision(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            role: Role::Customer,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_suspended(&self) -> bool {
        !self.is_active
    }

    /// Suspend this account on behalf of `actor`. Idempotent.
    pub fn suspend(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        if actor == self.id {
            return Err(DomainError::invariant("administrators cannot suspend themselves"));
        }
        if !self.is_active {
            return Ok(false);
        }
        self.is_active = false;
        self.updated_at = now;
        Ok(true)
    }

    /// Lift a suspension. Idempotent.
    pub fn reactivate(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_active {
            return false;
        }
        self.is_active = true;
        self.updated_at = now;
        true
    }

    pub fn change_role(&mut self, actor: UserId, role: Role, now: DateTime<Utc>) -> Result<(), DomainError> {
        if actor == self.id {
            return Err(DomainError::invariant("users cannot change their own role"));
        }
        if self.is_suspended() {
            return Err(DomainError::invariant("suspended users cannot be assigned a new role"));
        }
        self.role = role;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> UserAccount {
        UserAccount::provision(&Identity::new(UserId::new()), Utc::now())
    }

    #[test]
    fn provisioned_account_is_active_customer() {
        let account = customer();
        assert_eq!(account.role, Role::Customer);
        assert!(account.is_active);
    }

    #[test]
    fn suspend_is_idempotent() {
        let admin = UserId::new();
        let mut account = customer();

        assert_eq!(account.suspend(admin, Utc::now()), Ok(true));
        assert_eq!(account.suspend(admin, Utc::now()), Ok(false));
        assert!(account.is_suspended());

        assert!(account.reactivate(Utc::now()));
        assert!(!account.reactivate(Utc::now()));
    }

    #[test]
    fn cannot_suspend_self() {
        let mut account = customer();
        let own_id = account.id;
        assert!(account.suspend(own_id, Utc::now()).is_err());
        assert!(account.is_active);
    }

    #[test]
    fn suspended_user_cannot_be_promoted() {
        let admin = UserId::new();
        let mut account = customer();
        account.suspend(admin, Utc::now()).unwrap();

        let err = account.change_role(admin, Role::Tukang, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(account.role, Role::Customer);
    }
}
