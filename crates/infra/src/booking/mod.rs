//! Booking application service.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! Identity
//!   ↓
//! 1. Gate (identity → suspension → role), before any business logic
//!   ↓
//! 2. Load state through the store (ownership-scoped for customers)
//!   ↓
//! 3. Pure domain decision (aggregate command / voucher / settlement rules)
//!   ↓
//! 4. Persist (compare-and-swap on the order version)
//!   ↓
//! 5. Publish a BookingEvent (best-effort; drives cache invalidation)
//! ```
//!
//! Failures are folded into [`ServiceError`], whose variants map 1:1 onto
//! HTTP statuses at the API boundary.

mod admin;
mod orders;
mod payments;
mod reviews;
mod tracking;
mod vouchers;
mod warranty;

pub use orders::{NewOrder, OrderWithPayments};
pub use payments::{PaymentRequest, Receipt};
pub use vouchers::VoucherCheck;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, warn};

use tukangin_auth::{AuthorizedUser, AuthzError, Identity, RoleRequirement, UserAccount, authorize};
use tukangin_core::{DomainError, ExpectedVersion, OrderId, UserId};
use tukangin_events::{Event, EventBus};
use tukangin_orders::{ClaimError, Order, ReviewError};
use tukangin_payments::{PaymentRecord, SettlementError};
use tukangin_vouchers::VoucherError;

use crate::cache::ReadCache;
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::{BookingStore, StoreError};

/// Shown when a compare-and-swap write loses to a concurrent request.
pub const CONCURRENT_MODIFICATION: &str = "order was modified concurrently, please retry";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Your account has been suspended")]
    SuspensionBlocked,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    /// Detail is for logs only.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{what} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthorized => ServiceError::Unauthorized,
            AuthzError::Suspended => ServiceError::SuspensionBlocked,
            AuthzError::Forbidden(_) => ServiceError::Forbidden(value.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound("Not found".to_string()),
            StoreError::Conflict(detail) => {
                warn!(%detail, "compare-and-swap conflict");
                ServiceError::Validation(CONCURRENT_MODIFICATION.to_string())
            }
            StoreError::LimitReached(err) => ServiceError::Validation(err.to_string()),
            StoreError::Duplicate(detail) => {
                ServiceError::Validation(format!("already exists: {detail}"))
            }
            StoreError::Backend(detail) => {
                error!(%detail, "store backend failure");
                ServiceError::Unexpected(detail)
            }
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => ServiceError::NotFound("Not found".to_string()),
            other => ServiceError::Validation(other.message().to_string()),
        }
    }
}

impl From<VoucherError> for ServiceError {
    fn from(value: VoucherError) -> Self {
        ServiceError::Validation(value.to_string())
    }
}

impl From<SettlementError> for ServiceError {
    fn from(value: SettlementError) -> Self {
        ServiceError::Validation(value.to_string())
    }
}

impl From<ClaimError> for ServiceError {
    fn from(value: ClaimError) -> Self {
        match value {
            ClaimError::NotOwner => ServiceError::NotFound(value.to_string()),
            ClaimError::Invalid(err) => err.into(),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<ReviewError> for ServiceError {
    fn from(value: ReviewError) -> Self {
        match value {
            ReviewError::NotOwner => ServiceError::NotFound(value.to_string()),
            ReviewError::Invalid(err) => err.into(),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Application service over a [`BookingStore`] and an event bus.
pub struct BookingService<S: ?Sized, B: ?Sized> {
    store: Arc<S>,
    bus: Arc<B>,
    cache: Arc<ReadCache>,
}

impl<S: ?Sized, B: ?Sized> Clone for BookingService<S, B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: Arc::clone(&self.bus),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    pub fn new(store: Arc<S>, bus: Arc<B>, cache: Arc<ReadCache>) -> Self {
        Self { store, bus, cache }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    /// Create the caller's account on first sign-in. Existing accounts are
    /// returned unchanged, so a suspended user stays suspended.
    pub async fn provision(&self, identity: &Identity) -> ServiceResult<UserAccount> {
        let account = UserAccount::provision(identity, Utc::now());
        Ok(self.store.insert_user_if_absent(&account).await?)
    }

    /// Authorization gate: resolve the persisted account and check it.
    async fn gate(&self, identity: &Identity, requirement: RoleRequirement) -> ServiceResult<AuthorizedUser> {
        let account = self.store.find_user(identity.user_id).await?;
        Ok(authorize(Some(identity), account.as_ref(), requirement)?)
    }

    /// Order owned by `user_id`. Another user's order is reported as absent.
    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> ServiceResult<Order> {
        match self.store.find_order(order_id).await? {
            Some(order) if order.is_owned_by(user_id) => Ok(order),
            _ => Err(ServiceError::not_found("Order")),
        }
    }

    async fn any_order(&self, order_id: OrderId) -> ServiceResult<Order> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order"))
    }

    /// Persist `order` if nobody else wrote it since `previous_version`.
    async fn save_order(
        &self,
        order: &Order,
        previous_version: u64,
        payment: Option<&PaymentRecord>,
    ) -> ServiceResult<()> {
        Ok(self
            .store
            .update_order(order, ExpectedVersion::Exact(previous_version), payment)
            .await?)
    }

    fn publish(&self, event: BookingEvent, sequence_number: u64) {
        let event_type = event.event_type();
        if let Err(err) = self.bus.publish(event.into_envelope(sequence_number)) {
            warn!(event_type, error = ?err, "event publication failed; cached reads may be stale");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use tukangin_auth::Role;
    use tukangin_core::Money;
    use tukangin_events::InMemoryEventBus;
    use tukangin_orders::OrderDetails;

    use crate::store::{InMemoryStore, UserStore};

    pub type TestService = BookingService<InMemoryStore, InMemoryEventBus<BookingEnvelope>>;

    pub fn service() -> TestService {
        BookingService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(ReadCache::new(64)),
        )
    }

    pub async fn customer(svc: &TestService) -> Identity {
        let identity = Identity::new(UserId::new());
        svc.provision(&identity).await.unwrap();
        identity
    }

    pub async fn admin(svc: &TestService) -> Identity {
        let identity = Identity::new(UserId::new());
        let mut account = svc.provision(&identity).await.unwrap();
        account.role = Role::Admin;
        svc.store().update_user(&account).await.unwrap();
        identity
    }

    pub async fn suspend(svc: &TestService, identity: &Identity) {
        let mut account = svc.store().find_user(identity.user_id).await.unwrap().unwrap();
        account.is_active = false;
        svc.store().update_user(&account).await.unwrap();
    }

    pub fn details(price: u64) -> OrderDetails {
        OrderDetails {
            receiver_name: "Budi Santoso".into(),
            receiver_phone: "081234567890".into(),
            service: "ac-service".into(),
            service_price: Money::new(price),
            add_ons: vec![],
            address: "Jl. Sudirman 10, Jakarta".into(),
            description: "AC tidak dingin".into(),
            attachments: vec![],
        }
    }

    pub fn new_order(price: u64, voucher_code: Option<&str>) -> NewOrder {
        NewOrder {
            details: details(price),
            voucher_code: voucher_code.map(str::to_string),
        }
    }
}
