use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use tukangin_core::{
    Aggregate, AggregateRoot, DomainError, DomainResult, Money, OrderId, ProfessionalId, UserId,
    VoucherId,
};
use tukangin_events::Event;
use tukangin_vouchers::Discount;

use crate::validation;

/// Fixed warranty window applied when an order enters WARRANTY or is completed.
pub const WARRANTY_WINDOW_DAYS: i64 = 3;

/// Order status lifecycle.
///
/// ```text
/// PENDING ──deposit──▶ PROCESSING ──▶ COMPLETED ──claim──▶ WARRANTY
///    │                     │  └──────────────────────────▶ WARRANTY
///    └──────────▶ CANCELLED ◀┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Warranty,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Warranty => "WARRANTY",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "WARRANTY" => Ok(OrderStatus::Warranty),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Optional extra priced alongside the base service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub name: String,
    pub price: Money,
}

/// What the customer asked for. Prices come from the caller's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderDetails {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub service: String,
    pub service_price: Money,
    pub add_ons: Vec<AddOn>,
    pub address: String,
    pub description: String,
    pub attachments: Vec<String>,
}

impl OrderDetails {
    pub fn validate(&self) -> DomainResult<()> {
        validation::required("receiverName", &self.receiver_name)?;
        validation::required("receiverPhone", &self.receiver_phone)?;
        validation::phone(&self.receiver_phone)?;
        validation::required("service", &self.service)?;
        validation::required("address", &self.address)?;
        validation::required("description", &self.description)?;
        if self.service_price == Money::ZERO {
            return Err(DomainError::validation("servicePrice must be positive"));
        }
        if self.add_ons.iter().any(|a| a.name.trim().is_empty()) {
            return Err(DomainError::validation("add-on name is required"));
        }
        validation::urls("attachments", &self.attachments, validation::MAX_ATTACHMENTS)
    }

    /// Service price plus every selected add-on.
    pub fn subtotal(&self) -> DomainResult<Money> {
        self.add_ons
            .iter()
            .try_fold(self.service_price, |acc, a| acc.checked_add(a.price))
    }
}

/// Monetary breakdown. Always satisfies `total == subtotal - discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pricing {
    subtotal: Money,
    discount: Money,
    total: Money,
}

impl Pricing {
    /// Build a breakdown; the discount is clamped to the subtotal.
    pub fn new(subtotal: Money, discount: Money) -> Self {
        let discount = discount.min(subtotal);
        Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn total(&self) -> Money {
        self.total
    }
}

/// Aggregate root: Order.
///
/// Fields are public for stores and read models; state changes go through
/// [`OrderCommand`]s so every mutation yields an event and bumps `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub professional_id: Option<ProfessionalId>,
    pub status: OrderStatus,
    pub details: OrderDetails,
    pub pricing: Pricing,
    pub voucher_id: Option<VoucherId>,
    pub paid_at: Option<DateTime<Utc>>,
    pub deposit_amount: Option<Money>,
    pub balance_paid_at: Option<DateTime<Utc>>,
    pub balance_amount: Option<Money>,
    pub completed_at: Option<DateTime<Utc>>,
    pub warranty_until: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// Not-yet-placed instance; `Place` is the only command it accepts.
    pub fn empty(id: OrderId) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            id,
            user_id: UserId::from_uuid(Default::default()),
            professional_id: None,
            status: OrderStatus::Pending,
            details: OrderDetails::default(),
            pricing: Pricing::default(),
            voucher_id: None,
            paid_at: None,
            deposit_amount: None,
            balance_paid_at: None,
            balance_amount: None,
            completed_at: None,
            warranty_until: None,
            cancelled_at: None,
            created_at: epoch,
            updated_at: epoch,
            version: 0,
        }
    }

    fn is_placed(&self) -> bool {
        self.version > 0
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_deposit_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Both halves settled. No status change is tied to this; a product rule
    /// (e.g. auto-complete) can key off it.
    pub fn is_fully_paid(&self) -> bool {
        self.paid_at.is_some() && self.balance_paid_at.is_some()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub details: OrderDetails,
    /// Result of a successful voucher evaluation, if a code was supplied.
    pub discount: Option<Discount>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
    Place(PlaceOrder),
    SettleDeposit { amount: Money, occurred_at: DateTime<Utc> },
    SettleBalance { amount: Money, occurred_at: DateTime<Utc> },
    AssignProfessional { professional_id: ProfessionalId, occurred_at: DateTime<Utc> },
    Complete { occurred_at: DateTime<Utc> },
    StartWarranty { occurred_at: DateTime<Utc> },
    Cancel { occurred_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: OrderId,
        user_id: UserId,
        details: OrderDetails,
        pricing: Pricing,
        voucher_id: Option<VoucherId>,
        occurred_at: DateTime<Utc>,
    },
    DepositSettled {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
    BalanceSettled {
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
    ProfessionalAssigned {
        order_id: OrderId,
        user_id: UserId,
        professional_id: ProfessionalId,
        occurred_at: DateTime<Utc>,
    },
    Completed {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    WarrantyStarted {
        order_id: OrderId,
        user_id: UserId,
        warranty_until: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },
    Cancelled {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::Placed { order_id, .. }
            | OrderEvent::DepositSettled { order_id, .. }
            | OrderEvent::BalanceSettled { order_id, .. }
            | OrderEvent::ProfessionalAssigned { order_id, .. }
            | OrderEvent::Completed { order_id, .. }
            | OrderEvent::WarrantyStarted { order_id, .. }
            | OrderEvent::Cancelled { order_id, .. } => *order_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            OrderEvent::Placed { user_id, .. }
            | OrderEvent::DepositSettled { user_id, .. }
            | OrderEvent::BalanceSettled { user_id, .. }
            | OrderEvent::ProfessionalAssigned { user_id, .. }
            | OrderEvent::Completed { user_id, .. }
            | OrderEvent::WarrantyStarted { user_id, .. }
            | OrderEvent::Cancelled { user_id, .. } => *user_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed { .. } => "orders.order.placed",
            OrderEvent::DepositSettled { .. } => "orders.order.deposit_settled",
            OrderEvent::BalanceSettled { .. } => "orders.order.balance_settled",
            OrderEvent::ProfessionalAssigned { .. } => "orders.order.professional_assigned",
            OrderEvent::Completed { .. } => "orders.order.completed",
            OrderEvent::WarrantyStarted { .. } => "orders.order.warranty_started",
            OrderEvent::Cancelled { .. } => "orders.order.cancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed { occurred_at, .. }
            | OrderEvent::DepositSettled { occurred_at, .. }
            | OrderEvent::BalanceSettled { occurred_at, .. }
            | OrderEvent::ProfessionalAssigned { occurred_at, .. }
            | OrderEvent::Completed { occurred_at, .. }
            | OrderEvent::WarrantyStarted { occurred_at, .. }
            | OrderEvent::Cancelled { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::Placed {
                order_id,
                user_id,
                details,
                pricing,
                voucher_id,
                occurred_at,
            } => {
                self.id = *order_id;
                self.user_id = *user_id;
                self.status = OrderStatus::Pending;
                self.details = details.clone();
                self.pricing = *pricing;
                self.voucher_id = *voucher_id;
                self.created_at = *occurred_at;
            }
            OrderEvent::DepositSettled { amount, occurred_at, .. } => {
                self.status = OrderStatus::Processing;
                self.paid_at = Some(*occurred_at);
                self.deposit_amount = Some(*amount);
            }
            OrderEvent::BalanceSettled { amount, occurred_at, .. } => {
                self.balance_paid_at = Some(*occurred_at);
                self.balance_amount = Some(*amount);
            }
            OrderEvent::ProfessionalAssigned { professional_id, .. } => {
                self.professional_id = Some(*professional_id);
            }
            OrderEvent::Completed { occurred_at, .. } => {
                self.status = OrderStatus::Completed;
                self.completed_at = Some(*occurred_at);
            }
            OrderEvent::WarrantyStarted { warranty_until, .. } => {
                self.status = OrderStatus::Warranty;
                self.warranty_until = Some(*warranty_until);
            }
            OrderEvent::Cancelled { occurred_at, .. } => {
                self.status = OrderStatus::Cancelled;
                self.cancelled_at = Some(*occurred_at);
            }
        }

        self.updated_at = event.occurred_at();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if !matches!(command, OrderCommand::Place(_)) && !self.is_placed() {
            return Err(DomainError::not_found());
        }

        let order_id = self.id;
        let user_id = self.user_id;
        let event = match *command {
            OrderCommand::Place(ref cmd) => return self.handle_place(cmd),
            OrderCommand::SettleDeposit { amount, occurred_at } => {
                if self.status != OrderStatus::Pending {
                    return Err(DomainError::invariant(
                        "deposit can only be paid while the order is PENDING",
                    ));
                }
                if self.is_deposit_paid() {
                    return Err(DomainError::invariant("DP already paid"));
                }
                OrderEvent::DepositSettled { order_id, user_id, amount, occurred_at }
            }
            OrderCommand::SettleBalance { amount, occurred_at } => {
                if self.status != OrderStatus::Processing || !self.is_deposit_paid() {
                    return Err(DomainError::invariant(
                        "remaining balance can only be paid on a PROCESSING order with a paid deposit",
                    ));
                }
                if self.balance_paid_at.is_some() {
                    return Err(DomainError::invariant("order is already fully paid"));
                }
                OrderEvent::BalanceSettled { order_id, user_id, amount, occurred_at }
            }
            OrderCommand::AssignProfessional { professional_id, occurred_at } => {
                self.ensure_status(&[OrderStatus::Pending, OrderStatus::Processing], "assign a professional to")?;
                OrderEvent::ProfessionalAssigned { order_id, user_id, professional_id, occurred_at }
            }
            OrderCommand::Complete { occurred_at } => {
                self.ensure_status(&[OrderStatus::Processing, OrderStatus::Warranty], "complete")?;
                OrderEvent::Completed { order_id, user_id, occurred_at }
            }
            OrderCommand::StartWarranty { occurred_at } => {
                self.ensure_status(&[OrderStatus::Processing, OrderStatus::Completed], "start warranty on")?;
                OrderEvent::WarrantyStarted {
                    order_id,
                    user_id,
                    warranty_until: occurred_at + Duration::days(WARRANTY_WINDOW_DAYS),
                    occurred_at,
                }
            }
            OrderCommand::Cancel { occurred_at } => {
                self.ensure_status(&[OrderStatus::Pending, OrderStatus::Processing], "cancel")?;
                OrderEvent::Cancelled { order_id, user_id, occurred_at }
            }
        };

        Ok(vec![event])
    }
}

impl Order {
    fn ensure_status(&self, allowed: &[OrderStatus], action: &str) -> DomainResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "cannot {action} an order in status {}",
                self.status
            )))
        }
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }
        cmd.details.validate()?;

        let subtotal = cmd.details.subtotal()?;
        let discount = cmd.discount.map(|d| d.amount).unwrap_or(Money::ZERO);

        Ok(vec![OrderEvent::Placed {
            order_id: cmd.order_id,
            user_id: cmd.user_id,
            details: cmd.details.clone(),
            pricing: Pricing::new(subtotal, discount),
            voucher_id: cmd.discount.map(|d| d.voucher_id),
            occurred_at: cmd.occurred_at,
        }])
    }
}
