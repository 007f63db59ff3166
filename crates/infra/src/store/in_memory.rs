//! In-memory store for tests/dev.
//!
//! All tables sit behind one `RwLock`, so every multi-record write is
//! atomic with respect to other writers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tukangin_auth::UserAccount;
use tukangin_core::{
    Entity, ExpectedVersion, OrderId, ProfessionalId, UserId, VoucherId, WarrantyId,
};
use tukangin_dispatch::Professional;
use tukangin_orders::{Order, Review, Warranty, WarrantyClaim, WarrantyStatus};
use tukangin_payments::PaymentRecord;
use tukangin_vouchers::{Voucher, VoucherError};

use super::{
    OrderStore, ProfessionalStore, ReviewStore, StoreError, StoreResult, UserStore, VoucherStore,
    WarrantyStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserAccount>,
    orders: HashMap<OrderId, Order>,
    payments: Vec<PaymentRecord>,
    vouchers: HashMap<VoucherId, Voucher>,
    professionals: HashMap<ProfessionalId, Professional>,
    warranties: HashMap<WarrantyId, Warranty>,
    claims: Vec<WarrantyClaim>,
    reviews: HashMap<OrderId, Review>,
}

impl Tables {
    fn voucher_usage(&self, voucher_id: VoucherId, user_id: UserId) -> u32 {
        let count = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.voucher_id == Some(voucher_id))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    pub fn claims_for_warranty(&self, warranty_id: WarrantyId) -> StoreResult<Vec<WarrantyClaim>> {
        Ok(self
            .read()?
            .claims
            .iter()
            .filter(|c| c.warranty_id == warranty_id)
            .cloned()
            .collect())
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    orders
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn insert_user_if_absent(&self, user: &UserAccount) -> StoreResult<UserAccount> {
        let mut tables = self.write()?;
        Ok(tables
            .users
            .entry(*user.id())
            .or_insert_with(|| user.clone())
            .clone())
    }

    async fn update_user(&self, user: &UserAccount) -> StoreResult<()> {
        let mut tables = self.write()?;
        let slot = tables.users.get_mut(user.id()).ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let mut users: Vec<_> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let orders = self
            .read()?
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(newest_first(self.read()?.orders.values().cloned().collect()))
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(format!("order {}", order.id)));
        }

        if let Some(voucher_id) = order.voucher_id {
            let usage = tables.voucher_usage(voucher_id, order.user_id);
            let voucher = tables
                .vouchers
                .get_mut(&voucher_id)
                .ok_or(StoreError::LimitReached(VoucherError::NotFound))?;
            if voucher.global_limit_reached() {
                return Err(StoreError::LimitReached(VoucherError::GlobalLimitReached));
            }
            if voucher.user_limit_reached(usage) {
                return Err(StoreError::LimitReached(VoucherError::UserLimitReached));
            }
            voucher.used_count += 1;
        }

        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        payment: Option<&PaymentRecord>,
    ) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables.orders.get_mut(&order.id).ok_or(StoreError::NotFound)?;
        if !expected.matches(stored.version) {
            return Err(StoreError::Conflict(format!(
                "order {} is at version {}, expected {expected:?}",
                order.id, stored.version
            )));
        }
        *stored = order.clone();
        if let Some(p) = payment {
            tables.payments.push(p.clone());
        }
        Ok(())
    }

    async fn voucher_usage(&self, voucher_id: VoucherId, user_id: UserId) -> StoreResult<u32> {
        Ok(self.read()?.voucher_usage(voucher_id, user_id))
    }

    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<PaymentRecord>> {
        Ok(self
            .read()?
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VoucherStore for InMemoryStore {
    async fn find_voucher_by_code(&self, code: &str) -> StoreResult<Option<Voucher>> {
        Ok(self.read()?.vouchers.values().find(|v| v.code == code).cloned())
    }

    async fn list_vouchers(&self) -> StoreResult<Vec<Voucher>> {
        let mut vouchers: Vec<_> = self.read()?.vouchers.values().cloned().collect();
        vouchers.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(vouchers)
    }

    async fn insert_voucher(&self, voucher: &Voucher) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.vouchers.values().any(|v| v.code == voucher.code) {
            return Err(StoreError::Duplicate(format!("voucher code {}", voucher.code)));
        }
        tables.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfessionalStore for InMemoryStore {
    async fn find_professional(&self, id: ProfessionalId) -> StoreResult<Option<Professional>> {
        Ok(self.read()?.professionals.get(&id).cloned())
    }

    async fn list_professionals(&self) -> StoreResult<Vec<Professional>> {
        let mut pros: Vec<_> = self.read()?.professionals.values().cloned().collect();
        pros.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pros)
    }

    async fn insert_professional(&self, professional: &Professional) -> StoreResult<()> {
        self.write()?
            .professionals
            .insert(professional.id, professional.clone());
        Ok(())
    }

    async fn record_completed_job(&self, id: ProfessionalId) -> StoreResult<()> {
        let mut tables = self.write()?;
        let pro = tables.professionals.get_mut(&id).ok_or(StoreError::NotFound)?;
        pro.record_completed_job();
        Ok(())
    }
}

#[async_trait]
impl WarrantyStore for InMemoryStore {
    async fn find_warranty(&self, id: WarrantyId) -> StoreResult<Option<Warranty>> {
        Ok(self.read()?.warranties.get(&id).cloned())
    }

    async fn find_warranty_for_order(&self, order_id: OrderId) -> StoreResult<Option<Warranty>> {
        Ok(self
            .read()?
            .warranties
            .values()
            .find(|w| w.order_id == order_id)
            .cloned())
    }

    async fn list_warranties_for_user(&self, user_id: UserId) -> StoreResult<Vec<Warranty>> {
        let mut warranties: Vec<_> = self
            .read()?
            .warranties
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        warranties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(warranties)
    }

    async fn save_warranty(&self, warranty: &Warranty) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables
            .warranties
            .values()
            .any(|w| w.order_id == warranty.order_id && w.id != warranty.id)
        {
            return Err(StoreError::Duplicate(format!("warranty for order {}", warranty.order_id)));
        }
        tables.warranties.insert(warranty.id, warranty.clone());
        Ok(())
    }

    async fn record_claim(&self, warranty: &Warranty, claim: &WarrantyClaim) -> StoreResult<()> {
        let mut tables = self.write()?;
        let stored = tables.warranties.get_mut(&warranty.id).ok_or(StoreError::NotFound)?;
        if stored.status != WarrantyStatus::Active {
            return Err(StoreError::Conflict(format!("warranty {} is no longer active", warranty.id)));
        }
        *stored = warranty.clone();
        tables.claims.push(claim.clone());
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn find_review_for_order(&self, order_id: OrderId) -> StoreResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&order_id).cloned())
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.reviews.contains_key(&review.order_id) {
            return Err(StoreError::Duplicate(format!("review for order {}", review.order_id)));
        }
        let pro = tables
            .professionals
            .get_mut(&review.professional_id)
            .ok_or(StoreError::NotFound)?;
        pro.record_review(review.rating);
        tables.reviews.insert(review.order_id, review.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tukangin_core::{Aggregate, Money};
    use tukangin_orders::{OrderCommand, OrderDetails, PlaceOrder};
    use tukangin_vouchers::{DiscountType, NewVoucher};

    fn voucher(usage_limit: Option<u32>, per_user_limit: Option<u32>) -> Voucher {
        Voucher::create(
            NewVoucher {
                code: "HEMAT".into(),
                discount_type: DiscountType::Flat,
                discount_value: 10_000,
                max_discount: None,
                expiry_date: None,
                usage_limit,
                per_user_limit,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn order(user_id: UserId, voucher_id: Option<VoucherId>) -> Order {
        let id = OrderId::new();
        let mut order = Order::empty(id);
        order
            .execute(&OrderCommand::Place(PlaceOrder {
                order_id: id,
                user_id,
                details: OrderDetails {
                    receiver_name: "Ani".into(),
                    receiver_phone: "081311112222".into(),
                    service: "cleaning".into(),
                    service_price: Money::new(100_000),
                    add_ons: vec![],
                    address: "Jl. Asia Afrika 8".into(),
                    description: "Bersih-bersih rumah".into(),
                    attachments: vec![],
                },
                discount: voucher_id.map(|voucher_id| tukangin_vouchers::Discount {
                    voucher_id,
                    amount: Money::new(10_000),
                }),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order
    }

    #[tokio::test]
    async fn redemption_increments_usage_with_order() {
        let store = InMemoryStore::new();
        let v = voucher(Some(1), None);
        store.insert_voucher(&v).await.unwrap();

        let user = UserId::new();
        store.insert_order(&order(user, Some(v.id))).await.unwrap();

        let stored = store.find_voucher_by_code("HEMAT").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        assert_eq!(store.voucher_usage(v.id, user).await.unwrap(), 1);

        let err = store.insert_order(&order(UserId::new(), Some(v.id))).await.unwrap_err();
        assert_eq!(err, StoreError::LimitReached(VoucherError::GlobalLimitReached));
        assert_eq!(store.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn per_user_limit_is_rechecked_on_insert() {
        let store = InMemoryStore::new();
        let v = voucher(None, Some(1));
        store.insert_voucher(&v).await.unwrap();

        let user = UserId::new();
        store.insert_order(&order(user, Some(v.id))).await.unwrap();
        let err = store.insert_order(&order(user, Some(v.id))).await.unwrap_err();
        assert_eq!(err, StoreError::LimitReached(VoucherError::UserLimitReached));

        store.insert_order(&order(UserId::new(), Some(v.id))).await.unwrap();
    }

    #[tokio::test]
    async fn stale_update_is_a_conflict() {
        let store = InMemoryStore::new();
        let placed = order(UserId::new(), None);
        store.insert_order(&placed).await.unwrap();

        let mut first = placed.clone();
        first.execute(&OrderCommand::Cancel { occurred_at: Utc::now() }).unwrap();
        store
            .update_order(&first, ExpectedVersion::Exact(placed.version), None)
            .await
            .unwrap();

        let mut second = placed.clone();
        second
            .execute(&OrderCommand::SettleDeposit { amount: Money::new(50_000), occurred_at: Utc::now() })
            .unwrap();
        let err = store
            .update_order(&second, ExpectedVersion::Exact(placed.version), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn voucher_codes_are_unique() {
        let store = InMemoryStore::new();
        store.insert_voucher(&voucher(None, None)).await.unwrap();
        assert!(matches!(
            store.insert_voucher(&voucher(None, None)).await,
            Err(StoreError::Duplicate(_))
        ));
    }
}
