//! Warranty listing and claims.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_core::{Aggregate, WarrantyId};
use tukangin_events::EventBus;
use tukangin_orders::{ClaimError, NewClaim, Order, OrderCommand, OrderStatus, Warranty, WarrantyClaim, WarrantyStatus};

use super::{BookingService, ServiceError, ServiceResult};
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::{BookingStore, StoreError};

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    /// Caller's warranties, newest first. Active warranties past their
    /// window are reported (and stored) as EXPIRED.
    pub async fn list_warranties(&self, identity: &Identity) -> ServiceResult<Vec<Warranty>> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let now = Utc::now();

        let mut warranties = self.store.list_warranties_for_user(user.user_id).await?;
        for warranty in &mut warranties {
            if warranty.status == WarrantyStatus::Active && warranty.is_expired(now) {
                warranty.status = WarrantyStatus::Expired;
                warranty.updated_at = now;
                if let Err(err) = self.store.save_warranty(warranty).await {
                    warn!(warranty_id = %warranty.id, error = %err, "failed to persist warranty expiry");
                }
            }
        }
        Ok(warranties)
    }

    /// File a claim against an ACTIVE warranty within its window.
    ///
    /// A COMPLETED order moves to WARRANTY once the claim is stored.
    pub async fn claim_warranty(
        &self,
        identity: &Identity,
        warranty_id: WarrantyId,
        input: NewClaim,
    ) -> ServiceResult<WarrantyClaim> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;

        let mut warranty = match self.store.find_warranty(warranty_id).await? {
            Some(w) if w.user_id == user.user_id => w,
            _ => return Err(ClaimError::NotOwner.into()),
        };

        let now = Utc::now();
        let claim = match warranty.claim(user.user_id, input, now) {
            Ok(claim) => claim,
            Err(ClaimError::Expired) => {
                self.store.save_warranty(&warranty).await?;
                return Err(ClaimError::Expired.into());
            }
            Err(err) => return Err(err.into()),
        };

        self.store
            .record_claim(&warranty, &claim)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => ClaimError::NotActive.into(),
                other => ServiceError::from(other),
            })?;
        info!(claim_id = %claim.id, warranty_id = %warranty.id, order_id = %claim.order_id, "warranty claimed");

        if let Some(order) = self.store.find_order(claim.order_id).await? {
            self.start_warranty_after_claim(order, now).await;
        }

        self.publish(
            BookingEvent::WarrantyClaimed {
                warranty_id: warranty.id,
                claim_id: claim.id,
                order_id: claim.order_id,
                user_id: claim.user_id,
                occurred_at: now,
            },
            1,
        );
        Ok(claim)
    }

    // The claim is already stored; a failed order move is logged, not returned.
    async fn start_warranty_after_claim(&self, mut order: Order, now: DateTime<Utc>) {
        if order.status != OrderStatus::Completed {
            return;
        }
        let previous = order.version;
        let result = match order.execute(&OrderCommand::StartWarranty { occurred_at: now }) {
            Ok(_) => self.save_order(&order, previous, None).await,
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(()) => self.publish(
                BookingEvent::OrderStatusChanged {
                    order_id: order.id,
                    user_id: order.user_id,
                    status: order.status,
                    occurred_at: now,
                },
                order.version,
            ),
            Err(err) => warn!(order_id = %order.id, error = %err, "failed to move claimed order to WARRANTY"),
        }
    }

    /// Create the order's warranty if it has none; when the order entered
    /// WARRANTY, align an active warranty's window with `warranty_until`.
    pub(super) async fn ensure_warranty(&self, order: &Order, now: DateTime<Utc>) -> ServiceResult<()> {
        match self.store.find_warranty_for_order(order.id).await? {
            None => {
                if let Some(warranty) = Warranty::for_order(order, now) {
                    self.store.save_warranty(&warranty).await?;
                    info!(warranty_id = %warranty.id, order_id = %order.id, valid_until = %warranty.valid_until, "warranty created");
                }
            }
            Some(mut warranty) => {
                if let (OrderStatus::Warranty, WarrantyStatus::Active, Some(until)) =
                    (order.status, warranty.status, order.warranty_until)
                {
                    warranty.valid_until = until;
                    warranty.updated_at = now;
                    self.store.save_warranty(&warranty).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::PaymentRequest;
    use super::*;

    use chrono::Duration;
    use tukangin_core::{Money, OrderId};

    use crate::store::{InMemoryStore, OrderStore, WarrantyStore};

    async fn completed(svc: &TestService, me: &Identity) -> OrderId {
        let boss = admin(svc).await;
        let order = svc.place_order(me, new_order(100_000, None)).await.unwrap();
        svc.settle_payment(
            me,
            order.id,
            PaymentRequest {
                amount: Money::new(50_000),
                payment_method: "cash".into(),
            },
        )
        .await
        .unwrap();
        svc.set_order_status(&boss, order.id, OrderStatus::Completed).await.unwrap();
        order.id
    }

    fn claim_input() -> NewClaim {
        NewClaim {
            description: "Pipa bocor lagi setelah diperbaiki".into(),
            evidence_urls: vec!["https://cdn.example.com/bocor.jpg".into()],
        }
    }

    #[tokio::test]
    async fn completing_an_order_creates_an_active_warranty() {
        let svc = service();
        let me = customer(&svc).await;
        let order_id = completed(&svc, &me).await;

        let warranties = svc.list_warranties(&me).await.unwrap();
        assert_eq!(warranties.len(), 1);
        assert_eq!(warranties[0].order_id, order_id);
        assert_eq!(warranties[0].status, WarrantyStatus::Active);
    }

    #[tokio::test]
    async fn claim_marks_warranty_claimed_and_moves_order_to_warranty() {
        let svc = service();
        let me = customer(&svc).await;
        let order_id = completed(&svc, &me).await;
        let warranty = svc.list_warranties(&me).await.unwrap().remove(0);

        let claim = svc.claim_warranty(&me, warranty.id, claim_input()).await.unwrap();
        assert_eq!(claim.order_id, order_id);

        let stored = svc.store().find_warranty(warranty.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WarrantyStatus::Claimed);
        let order = svc.store().find_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Warranty);
        assert_eq!(InMemoryStore::claims_for_warranty(svc.store(), warranty.id).unwrap().len(), 1);

        let err = svc.claim_warranty(&me, warranty.id, claim_input()).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation("Warranty is not active".into()));
    }

    #[tokio::test]
    async fn expired_warranty_is_marked_and_rejected() {
        let svc = service();
        let me = customer(&svc).await;
        completed(&svc, &me).await;
        let mut warranty = svc.list_warranties(&me).await.unwrap().remove(0);
        warranty.valid_until = Utc::now() - Duration::hours(1);
        svc.store().save_warranty(&warranty).await.unwrap();

        let err = svc.claim_warranty(&me, warranty.id, claim_input()).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation("Warranty has expired".into()));

        let stored = svc.store().find_warranty(warranty.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WarrantyStatus::Expired);
    }

    #[tokio::test]
    async fn other_users_cannot_claim() {
        let svc = service();
        let me = customer(&svc).await;
        let other = customer(&svc).await;
        completed(&svc, &me).await;
        let warranty = svc.list_warranties(&me).await.unwrap().remove(0);

        let err = svc.claim_warranty(&other, warranty.id, claim_input()).await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("Warranty not found".into()));
    }

    #[tokio::test]
    async fn short_description_is_rejected() {
        let svc = service();
        let me = customer(&svc).await;
        completed(&svc, &me).await;
        let warranty = svc.list_warranties(&me).await.unwrap().remove(0);

        let mut input = claim_input();
        input.description = "rusak".into();
        let err = svc.claim_warranty(&me, warranty.id, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("at least 10")));
    }
}
