//! Integration events published after a successful write.
//!
//! These are coarser than the order aggregate's own events: they describe
//! what changed from the point of view of read models and notifiers, and
//! carry just enough data to derive cache tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tukangin_auth::Role;
use tukangin_core::{ClaimId, Money, OrderId, ProfessionalId, ReviewId, UserId, VoucherId, WarrantyId};
use tukangin_events::{Event, EventEnvelope};
use tukangin_orders::OrderStatus;
use tukangin_payments::PaymentKind;

use crate::cache::{TAG_ALL_ORDERS, TAG_PROFESSIONALS, TAG_USERS, TAG_VOUCHERS, user_orders_tag};

pub type BookingEnvelope = EventEnvelope<BookingEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        total: Money,
        voucher_id: Option<VoucherId>,
        occurred_at: DateTime<Utc>,
    },
    /// Deposit or remaining balance settled.
    OrderPaid {
        order_id: OrderId,
        user_id: UserId,
        kind: PaymentKind,
        amount: Money,
        receipt_id: String,
        occurred_at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
    ProfessionalAssigned {
        order_id: OrderId,
        user_id: UserId,
        professional_id: ProfessionalId,
        occurred_at: DateTime<Utc>,
    },
    VoucherConsumed {
        voucher_id: VoucherId,
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    VoucherCreated {
        voucher_id: VoucherId,
        code: String,
        occurred_at: DateTime<Utc>,
    },
    UserStatusChanged {
        user_id: UserId,
        is_active: bool,
        role: Role,
        occurred_at: DateTime<Utc>,
    },
    ReviewSubmitted {
        review_id: ReviewId,
        order_id: OrderId,
        professional_id: ProfessionalId,
        rating: u8,
        occurred_at: DateTime<Utc>,
    },
    ProfessionalAdded {
        professional_id: ProfessionalId,
        occurred_at: DateTime<Utc>,
    },
    WarrantyClaimed {
        warranty_id: WarrantyId,
        claim_id: ClaimId,
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl BookingEvent {
    pub fn aggregate_type(&self) -> &'static str {
        match self {
            BookingEvent::OrderCreated { .. }
            | BookingEvent::OrderPaid { .. }
            | BookingEvent::OrderStatusChanged { .. }
            | BookingEvent::ProfessionalAssigned { .. } => "orders.order",
            BookingEvent::VoucherConsumed { .. } | BookingEvent::VoucherCreated { .. } => {
                "vouchers.voucher"
            }
            BookingEvent::UserStatusChanged { .. } => "auth.user",
            BookingEvent::ReviewSubmitted { .. } => "orders.review",
            BookingEvent::ProfessionalAdded { .. } => "dispatch.professional",
            BookingEvent::WarrantyClaimed { .. } => "orders.warranty",
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        match self {
            BookingEvent::OrderCreated { order_id, .. }
            | BookingEvent::OrderPaid { order_id, .. }
            | BookingEvent::OrderStatusChanged { order_id, .. }
            | BookingEvent::ProfessionalAssigned { order_id, .. } => *order_id.as_uuid(),
            BookingEvent::VoucherConsumed { voucher_id, .. }
            | BookingEvent::VoucherCreated { voucher_id, .. } => *voucher_id.as_uuid(),
            BookingEvent::UserStatusChanged { user_id, .. } => *user_id.as_uuid(),
            BookingEvent::ReviewSubmitted { review_id, .. } => *review_id.as_uuid(),
            BookingEvent::ProfessionalAdded { professional_id, .. } => *professional_id.as_uuid(),
            BookingEvent::WarrantyClaimed { warranty_id, .. } => *warranty_id.as_uuid(),
        }
    }

    /// Cache tags made stale by this event.
    pub fn cache_tags(&self) -> Vec<String> {
        match self {
            BookingEvent::OrderCreated { user_id, .. }
            | BookingEvent::OrderPaid { user_id, .. }
            | BookingEvent::WarrantyClaimed { user_id, .. } => {
                vec![TAG_ALL_ORDERS.to_string(), user_orders_tag(*user_id)]
            }
            BookingEvent::OrderStatusChanged { user_id, status, .. } => {
                let mut tags = vec![TAG_ALL_ORDERS.to_string(), user_orders_tag(*user_id)];
                // Completion credits the assigned professional's job count.
                if *status == OrderStatus::Completed {
                    tags.push(TAG_PROFESSIONALS.to_string());
                }
                tags
            }
            BookingEvent::ProfessionalAssigned { user_id, .. } => vec![
                TAG_ALL_ORDERS.to_string(),
                user_orders_tag(*user_id),
                TAG_PROFESSIONALS.to_string(),
            ],
            BookingEvent::VoucherConsumed { .. } | BookingEvent::VoucherCreated { .. } => {
                vec![TAG_VOUCHERS.to_string()]
            }
            BookingEvent::UserStatusChanged { .. } => vec![TAG_USERS.to_string()],
            BookingEvent::ReviewSubmitted { .. } | BookingEvent::ProfessionalAdded { .. } => {
                vec![TAG_PROFESSIONALS.to_string()]
            }
        }
    }

    /// Wrap for publication. `sequence_number` is the aggregate version
    /// after the write, or 1 for records without one.
    pub fn into_envelope(self, sequence_number: u64) -> BookingEnvelope {
        EventEnvelope::wrap(
            self.aggregate_id(),
            self.aggregate_type(),
            sequence_number,
            self,
        )
    }
}

impl Event for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::OrderCreated { .. } => "booking.order.created",
            BookingEvent::OrderPaid { .. } => "booking.order.paid",
            BookingEvent::OrderStatusChanged { .. } => "booking.order.status_changed",
            BookingEvent::ProfessionalAssigned { .. } => "booking.order.professional_assigned",
            BookingEvent::VoucherConsumed { .. } => "booking.voucher.consumed",
            BookingEvent::VoucherCreated { .. } => "booking.voucher.created",
            BookingEvent::UserStatusChanged { .. } => "booking.user.status_changed",
            BookingEvent::ReviewSubmitted { .. } => "booking.review.submitted",
            BookingEvent::ProfessionalAdded { .. } => "booking.professional.added",
            BookingEvent::WarrantyClaimed { .. } => "booking.warranty.claimed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BookingEvent::OrderCreated { occurred_at, .. }
            | BookingEvent::OrderPaid { occurred_at, .. }
            | BookingEvent::OrderStatusChanged { occurred_at, .. }
            | BookingEvent::ProfessionalAssigned { occurred_at, .. }
            | BookingEvent::VoucherConsumed { occurred_at, .. }
            | BookingEvent::VoucherCreated { occurred_at, .. }
            | BookingEvent::UserStatusChanged { occurred_at, .. }
            | BookingEvent::ReviewSubmitted { occurred_at, .. }
            | BookingEvent::ProfessionalAdded { occurred_at, .. }
            | BookingEvent::WarrantyClaimed { occurred_at, .. } => *occurred_at,
        }
    }
}
