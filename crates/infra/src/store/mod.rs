//! Persistence gateway.
//!
//! One trait per table family, combined into [`BookingStore`]. Every write
//! that must be atomic with another (order + voucher usage, order + payment,
//! warranty + claim, review + professional rating) is a single trait method
//! so backends can wrap it in one lock or one transaction.

use async_trait::async_trait;
use thiserror::Error;

use tukangin_auth::UserAccount;
use tukangin_core::{ExpectedVersion, OrderId, ProfessionalId, UserId, VoucherId, WarrantyId};
use tukangin_dispatch::Professional;
use tukangin_orders::{Order, Review, Warranty, WarrantyClaim};
use tukangin_payments::PaymentRecord;
use tukangin_vouchers::{Voucher, VoucherError};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// Compare-and-swap lost against a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Voucher redemption re-check failed at commit time.
    #[error("{0}")]
    LimitReached(VoucherError),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserAccount>>;

    /// Insert unless an account with the same id exists; returns the stored one.
    async fn insert_user_if_absent(&self, user: &UserAccount) -> StoreResult<UserAccount>;

    async fn update_user(&self, user: &UserAccount) -> StoreResult<()>;

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

    /// Newest first.
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    /// Persist a new order. When it references a voucher, the voucher's
    /// global and per-user limits are re-checked and `used_count` is
    /// incremented in the same operation.
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    /// Replace an order if the stored version still equals `expected`,
    /// writing `payment` alongside.
    async fn update_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        payment: Option<&PaymentRecord>,
    ) -> StoreResult<()>;

    /// Orders by `user_id` that consumed `voucher_id`.
    async fn voucher_usage(&self, voucher_id: VoucherId, user_id: UserId) -> StoreResult<u32>;

    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<PaymentRecord>>;
}

#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// `code` must already be normalized.
    async fn find_voucher_by_code(&self, code: &str) -> StoreResult<Option<Voucher>>;

    async fn list_vouchers(&self) -> StoreResult<Vec<Voucher>>;

    /// `Duplicate` when the code is taken.
    async fn insert_voucher(&self, voucher: &Voucher) -> StoreResult<()>;
}

#[async_trait]
pub trait ProfessionalStore: Send + Sync {
    async fn find_professional(&self, id: ProfessionalId) -> StoreResult<Option<Professional>>;

    async fn list_professionals(&self) -> StoreResult<Vec<Professional>>;

    async fn insert_professional(&self, professional: &Professional) -> StoreResult<()>;

    async fn record_completed_job(&self, id: ProfessionalId) -> StoreResult<()>;
}

#[async_trait]
pub trait WarrantyStore: Send + Sync {
    async fn find_warranty(&self, id: WarrantyId) -> StoreResult<Option<Warranty>>;

    async fn find_warranty_for_order(&self, order_id: OrderId) -> StoreResult<Option<Warranty>>;

    async fn list_warranties_for_user(&self, user_id: UserId) -> StoreResult<Vec<Warranty>>;

    /// Insert or replace by id. One warranty per order is enforced.
    async fn save_warranty(&self, warranty: &Warranty) -> StoreResult<()>;

    /// Store `claim` and the now-CLAIMED `warranty`, provided the stored
    /// warranty is still ACTIVE (`Conflict` otherwise).
    async fn record_claim(&self, warranty: &Warranty, claim: &WarrantyClaim) -> StoreResult<()>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn find_review_for_order(&self, order_id: OrderId) -> StoreResult<Option<Review>>;

    /// Insert the review and fold its rating into the professional's
    /// running average. `Duplicate` when the order was already reviewed.
    async fn insert_review(&self, review: &Review) -> StoreResult<()>;
}

/// Everything the booking service needs from persistence.
pub trait BookingStore:
    UserStore + OrderStore + VoucherStore + ProfessionalStore + WarrantyStore + ReviewStore
{
}

impl<T> BookingStore for T where
    T: UserStore + OrderStore + VoucherStore + ProfessionalStore + WarrantyStore + ReviewStore
{
}
