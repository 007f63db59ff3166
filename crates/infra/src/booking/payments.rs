//! DP and remaining-balance settlement.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_core::{Aggregate, Money, OrderId};
use tukangin_events::EventBus;
use tukangin_orders::OrderStatus;
use tukangin_payments::{PaymentKind, decide_settlement};

use super::{BookingService, ServiceResult};
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::BookingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Money,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub order_status: OrderStatus,
    pub kind: PaymentKind,
    pub amount: Money,
    pub message: String,
}

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    /// Settle the next payment stage of an order owned by the caller.
    ///
    /// The order write is a compare-and-swap on the version read here, so
    /// two concurrent attempts cannot both settle the same stage.
    pub async fn settle_payment(
        &self,
        identity: &Identity,
        order_id: OrderId,
        request: PaymentRequest,
    ) -> ServiceResult<Receipt> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let mut order = self.owned_order(user.user_id, order_id).await?;

        let now = Utc::now();
        let settlement = decide_settlement(&order, request.amount, &request.payment_method, now)?;

        let previous = order.version;
        order.execute(&settlement.command())?;
        let record = settlement.record(&order, &request.payment_method);
        self.save_order(&order, previous, Some(&record)).await?;

        info!(
            order_id = %order.id,
            receipt_id = %record.receipt_id,
            kind = record.kind.as_str(),
            amount = record.amount.amount(),
            expected = settlement.expected.amount(),
            "payment settled"
        );

        self.publish(
            BookingEvent::OrderPaid {
                order_id: order.id,
                user_id: order.user_id,
                kind: record.kind,
                amount: record.amount,
                receipt_id: record.receipt_id.clone(),
                occurred_at: now,
            },
            order.version,
        );

        let message = match record.kind {
            PaymentKind::Dp => "DP payment received, your order is now being processed",
            PaymentKind::Balance => "Remaining balance received, your order is fully paid",
        };
        Ok(Receipt {
            receipt_id: record.receipt_id,
            order_status: order.status,
            kind: record.kind,
            amount: record.amount,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{CONCURRENT_MODIFICATION, ServiceError};
    use super::*;

    use tukangin_core::ExpectedVersion;

    use crate::store::OrderStore;

    fn pay(amount: u64) -> PaymentRequest {
        PaymentRequest {
            amount: Money::new(amount),
            payment_method: "bank_transfer".into(),
        }
    }

    #[tokio::test]
    async fn deposit_moves_pending_order_to_processing() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        let receipt = svc.settle_payment(&me, order.id, pay(50_500)).await.unwrap();

        assert_eq!(receipt.kind, PaymentKind::Dp);
        assert_eq!(receipt.order_status, OrderStatus::Processing);
        assert!(receipt.receipt_id.starts_with("RCPT-"));

        let stored = svc.get_order(&me, order.id).await.unwrap();
        assert!(stored.order.paid_at.is_some());
        assert_eq!(stored.payments.len(), 1);
        assert_eq!(stored.payments[0].receipt_id, receipt.receipt_id);
    }

    #[tokio::test]
    async fn deposit_outside_tolerance_is_rejected_without_mutation() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        let err = svc.settle_payment(&me, order.id, pay(80_000)).await.unwrap_err();

        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("Invalid payment amount")));
        let stored = svc.store().find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn balance_keeps_processing_and_marks_fully_paid() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();
        svc.settle_payment(&me, order.id, pay(50_000)).await.unwrap();

        let receipt = svc.settle_payment(&me, order.id, pay(50_000)).await.unwrap();
        assert_eq!(receipt.kind, PaymentKind::Balance);
        assert_eq!(receipt.order_status, OrderStatus::Processing);

        let stored = svc.store().find_order(order.id).await.unwrap().unwrap();
        assert!(stored.is_fully_paid());

        let err = svc.settle_payment(&me, order.id, pay(50_000)).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation("Order is already fully paid".into()));
    }

    #[tokio::test]
    async fn cancelled_order_cannot_be_paid() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();
        svc.cancel_order(&me, order.id).await.unwrap();

        let err = svc.settle_payment(&me, order.id, pay(50_000)).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation("Order is cancelled, cannot pay".into()));
    }

    #[tokio::test]
    async fn another_users_order_is_not_found() {
        let svc = service();
        let me = customer(&svc).await;
        let other = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        let err = svc.settle_payment(&other, order.id, pay(50_000)).await.unwrap_err();
        assert_eq!(err, ServiceError::NotFound("Order not found".into()));
    }

    #[tokio::test]
    async fn stale_version_loses_the_settlement_race() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        // A concurrent writer bumps the stored version first.
        let mut raced = order.clone();
        raced.version += 1;
        svc.store()
            .update_order(&raced, ExpectedVersion::Exact(order.version), None)
            .await
            .unwrap();

        let mut stale = order.clone();
        stale.execute(&tukangin_orders::OrderCommand::SettleDeposit {
            amount: Money::new(50_000),
            occurred_at: Utc::now(),
        })
        .unwrap();
        let err = svc.save_order(&stale, order.version, None).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation(CONCURRENT_MODIFICATION.into()));
    }

    #[tokio::test]
    async fn suspended_user_cannot_pay() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();
        suspend(&svc, &me).await;

        let err = svc.settle_payment(&me, order.id, pay(50_000)).await.unwrap_err();
        assert_eq!(err, ServiceError::SuspensionBlocked);
    }
}
