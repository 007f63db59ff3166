use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tukangin_core::{DomainError, Money, OrderId, UserId};
use tukangin_orders::{Order, OrderCommand, OrderStatus};

/// Accepted absolute difference between paid and expected amounts.
pub const AMOUNT_TOLERANCE: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    /// Down payment: half of the total, rounded.
    Dp,
    /// Whatever remains after the DP.
    Balance,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Dp => "DP",
            PaymentKind::Balance => "BALANCE",
        }
    }
}

impl core::str::FromStr for PaymentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DP" => Ok(PaymentKind::Dp),
            "BALANCE" => Ok(PaymentKind::Balance),
            other => Err(DomainError::validation(format!("unknown payment kind '{other}'"))),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("DP already paid")]
    DepositAlreadyPaid,
    #[error("Order is already fully paid")]
    BalanceAlreadyPaid,
    #[error("Order {0}")]
    InvalidState(&'static str),
    #[error("Invalid payment amount, expected {expected}")]
    InvalidAmount { expected: Money },
    #[error("paymentMethod is required")]
    MissingMethod,
}

/// Half the total, rounded half-up.
pub fn expected_deposit(order: &Order) -> Money {
    order.pricing.total().half_rounded()
}

/// Total minus the DP actually recorded (or the expected DP if none yet).
pub fn expected_balance(order: &Order) -> Money {
    let deposit = order.deposit_amount.unwrap_or_else(|| expected_deposit(order));
    order.pricing.total().saturating_sub(deposit)
}

/// An accepted payment, ready to be applied and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub kind: PaymentKind,
    pub amount: Money,
    pub expected: Money,
    pub occurred_at: DateTime<Utc>,
}

impl Settlement {
    /// Aggregate command that records this settlement on the order.
    pub fn command(&self) -> OrderCommand {
        match self.kind {
            PaymentKind::Dp => OrderCommand::SettleDeposit {
                amount: self.amount,
                occurred_at: self.occurred_at,
            },
            PaymentKind::Balance => OrderCommand::SettleBalance {
                amount: self.amount,
                occurred_at: self.occurred_at,
            },
        }
    }

    pub fn record(&self, order: &Order, method: &str) -> PaymentRecord {
        PaymentRecord {
            receipt_id: new_receipt_id(),
            order_id: order.id,
            user_id: order.user_id,
            kind: self.kind,
            amount: self.amount,
            method: method.trim().to_string(),
            paid_at: self.occurred_at,
        }
    }
}

/// Ledger row written in the same store operation as the order update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub receipt_id: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub kind: PaymentKind,
    pub amount: Money,
    pub method: String,
    pub paid_at: DateTime<Utc>,
}

pub fn new_receipt_id() -> String {
    format!("RCPT-{}", uuid::Uuid::now_v7().simple()).to_uppercase()
}

/// Decide which stage `amount` settles for `order`.
///
/// PENDING orders take the DP; PROCESSING orders with a paid DP take the
/// balance. Every other state is rejected with a reason.
pub fn decide_settlement(
    order: &Order,
    amount: Money,
    payment_method: &str,
    now: DateTime<Utc>,
) -> Result<Settlement, SettlementError> {
    if payment_method.trim().is_empty() {
        return Err(SettlementError::MissingMethod);
    }

    let (kind, expected) = match order.status {
        OrderStatus::Pending => {
            if order.paid_at.is_some() {
                return Err(SettlementError::DepositAlreadyPaid);
            }
            (PaymentKind::Dp, expected_deposit(order))
        }
        OrderStatus::Processing => {
            if order.paid_at.is_none() {
                return Err(SettlementError::InvalidState("has no recorded DP"));
            }
            if order.balance_paid_at.is_some() {
                return Err(SettlementError::BalanceAlreadyPaid);
            }
            (PaymentKind::Balance, expected_balance(order))
        }
        OrderStatus::Completed | OrderStatus::Warranty => {
            return Err(SettlementError::InvalidState("is already finished, no payment needed"));
        }
        OrderStatus::Cancelled => {
            return Err(SettlementError::InvalidState("is cancelled, cannot pay"));
        }
    };

    if !amount.within(expected, AMOUNT_TOLERANCE) {
        return Err(SettlementError::InvalidAmount { expected });
    }

    Ok(Settlement {
        kind,
        amount,
        expected,
        occurred_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tukangin_core::Aggregate;
    use tukangin_orders::{OrderDetails, PlaceOrder};

    fn placed(total: u64) -> Order {
        let id = OrderId::new();
        let mut order = Order::empty(id);
        order
            .execute(&OrderCommand::Place(PlaceOrder {
                order_id: id,
                user_id: UserId::new(),
                details: OrderDetails {
                    receiver_name: "Budi".into(),
                    receiver_phone: "081298765432".into(),
                    service: "plumbing".into(),
                    service_price: Money::new(total),
                    add_ons: vec![],
                    address: "Jl. Sudirman 5".into(),
                    description: "Pipa dapur bocor".into(),
                    attachments: vec![],
                },
                discount: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order
    }

    fn settle(order: &mut Order, amount: u64) -> Settlement {
        let s = decide_settlement(order, Money::new(amount), "qris", Utc::now()).unwrap();
        order.execute(&s.command()).unwrap();
        s
    }

    #[test]
    fn deposit_then_balance() {
        let mut order = placed(200_000);

        let dp = settle(&mut order, 100_000);
        assert_eq!(dp.kind, PaymentKind::Dp);
        assert_eq!(order.status, OrderStatus::Processing);

        let balance = settle(&mut order, 100_000);
        assert_eq!(balance.kind, PaymentKind::Balance);
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.is_fully_paid());
    }

    #[test]
    fn wrong_deposit_amount_reports_expected() {
        let order = placed(200_000);
        assert_eq!(
            decide_settlement(&order, Money::new(150_000), "qris", Utc::now()),
            Err(SettlementError::InvalidAmount { expected: Money::new(100_000) })
        );
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn odd_total_rounds_deposit_up() {
        let mut order = placed(100_001);
        assert_eq!(expected_deposit(&order), Money::new(50_001));
        settle(&mut order, 50_001);
        assert_eq!(expected_balance(&order), Money::new(50_000));
    }

    #[test]
    fn balance_uses_recorded_deposit() {
        let mut order = placed(200_000);
        settle(&mut order, 99_500);
        assert_eq!(expected_balance(&order), Money::new(100_500));
    }

    #[test]
    fn finished_and_cancelled_orders_reject_payment() {
        let mut order = placed(100_000);
        settle(&mut order, 50_000);
        order.execute(&OrderCommand::Complete { occurred_at: Utc::now() }).unwrap();
        assert_eq!(
            decide_settlement(&order, Money::new(50_000), "qris", Utc::now()),
            Err(SettlementError::InvalidState("is already finished, no payment needed"))
        );

        let mut order = placed(100_000);
        order.execute(&OrderCommand::Cancel { occurred_at: Utc::now() }).unwrap();
        let err = decide_settlement(&order, Money::new(50_000), "qris", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn second_balance_is_rejected() {
        let mut order = placed(100_000);
        settle(&mut order, 50_000);
        settle(&mut order, 50_000);
        assert_eq!(
            decide_settlement(&order, Money::new(50_000), "qris", Utc::now()),
            Err(SettlementError::BalanceAlreadyPaid)
        );
    }

    #[test]
    fn payment_method_is_required() {
        let order = placed(100_000);
        assert_eq!(
            decide_settlement(&order, Money::new(50_000), "  ", Utc::now()),
            Err(SettlementError::MissingMethod)
        );
    }

    #[test]
    fn receipt_ids_are_prefixed_and_unique() {
        let a = new_receipt_id();
        let b = new_receipt_id();
        assert!(a.starts_with("RCPT-"));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn deposit_accepted_only_within_tolerance(total in 2_000u64..50_000_000, delta in 0u64..5_000) {
            let order = placed(total);
            let expected = expected_deposit(&order).amount();
            let res = decide_settlement(&order, Money::new(expected + delta), "va", Utc::now());
            prop_assert_eq!(res.is_ok(), delta <= AMOUNT_TOLERANCE);
        }
    }
}
