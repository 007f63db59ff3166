//! Customer order operations: create, list, read, cancel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_core::{Aggregate, Money, OrderId, UserId};
use tukangin_events::EventBus;
use tukangin_orders::{Order, OrderCommand, OrderDetails, OrderStatus, PlaceOrder};
use tukangin_payments::PaymentRecord;
use tukangin_vouchers::{Discount, evaluate, normalize_code};

use super::{BookingService, ServiceError, ServiceResult};
use crate::cache::{TAG_ALL_ORDERS, user_orders_tag};
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::BookingStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub details: OrderDetails,
    pub voucher_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithPayments {
    pub order: Order,
    pub payments: Vec<PaymentRecord>,
}

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    /// Place a PENDING order. A voucher that fails evaluation aborts the
    /// whole operation; nothing is written.
    pub async fn place_order(&self, identity: &Identity, input: NewOrder) -> ServiceResult<Order> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;

        input.details.validate()?;
        let subtotal = input.details.subtotal()?;
        let now = Utc::now();

        let code = input
            .voucher_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());
        let discount = match code {
            Some(code) => Some(self.discount_for(user.user_id, &code, subtotal, now).await?),
            None => None,
        };

        let order_id = OrderId::new();
        let mut order = Order::empty(order_id);
        order.execute(&OrderCommand::Place(PlaceOrder {
            order_id,
            user_id: user.user_id,
            details: input.details,
            discount,
            occurred_at: now,
        }))?;

        self.store.insert_order(&order).await?;
        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total = order.pricing.total().amount(),
            voucher_id = ?order.voucher_id,
            "order placed"
        );

        self.publish(
            BookingEvent::OrderCreated {
                order_id: order.id,
                user_id: order.user_id,
                total: order.pricing.total(),
                voucher_id: order.voucher_id,
                occurred_at: now,
            },
            order.version,
        );
        if let Some(voucher_id) = order.voucher_id {
            self.publish(
                BookingEvent::VoucherConsumed {
                    voucher_id,
                    order_id: order.id,
                    user_id: order.user_id,
                    occurred_at: now,
                },
                1,
            );
        }

        Ok(order)
    }

    async fn discount_for(
        &self,
        user_id: UserId,
        code: &str,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> ServiceResult<Discount> {
        let voucher = self.store.find_voucher_by_code(code).await?;
        let usage = match &voucher {
            Some(v) => self.store.voucher_usage(v.id, user_id).await?,
            None => 0,
        };
        Ok(evaluate(voucher.as_ref(), usage, subtotal, now)?)
    }

    /// Caller's orders, newest first.
    pub async fn list_orders(&self, identity: &Identity) -> ServiceResult<Vec<Order>> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;

        let tag = user_orders_tag(user.user_id);
        if let Some(cached) = self.cache.get_as::<Vec<Order>>(&tag) {
            return Ok(cached);
        }

        let ticket = self.cache.ticket();
        let orders = self.store.list_orders_for_user(user.user_id).await?;
        self.cache.put_as(ticket, &tag, &[tag.as_str()], &orders);
        Ok(orders)
    }

    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> ServiceResult<OrderWithPayments> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let order = self.owned_order(user.user_id, order_id).await?;
        let payments = self.store.payments_for_order(order.id).await?;
        Ok(OrderWithPayments { order, payments })
    }

    /// Customers may only withdraw an order before paying the DP.
    pub async fn cancel_order(&self, identity: &Identity, order_id: OrderId) -> ServiceResult<Order> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let mut order = self.owned_order(user.user_id, order_id).await?;

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::validation("Only pending orders can be cancelled"));
        }

        let previous = order.version;
        let now = Utc::now();
        order.execute(&OrderCommand::Cancel { occurred_at: now })?;
        self.save_order(&order, previous, None).await?;
        info!(order_id = %order.id, "order cancelled by customer");

        self.publish(
            BookingEvent::OrderStatusChanged {
                order_id: order.id,
                user_id: order.user_id,
                status: order.status,
                occurred_at: now,
            },
            order.version,
        );
        Ok(order)
    }

    /// Every order, newest first (admin dashboard).
    pub async fn list_all_orders(&self, identity: &Identity) -> ServiceResult<Vec<Order>> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        if let Some(cached) = self.cache.get_as::<Vec<Order>>(TAG_ALL_ORDERS) {
            return Ok(cached);
        }

        let ticket = self.cache.ticket();
        let orders = self.store.list_orders().await?;
        self.cache.put_as(ticket, TAG_ALL_ORDERS, &[TAG_ALL_ORDERS], &orders);
        Ok(orders)
    }
}
