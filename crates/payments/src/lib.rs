//! Two-stage payment settlement.
//!
//! An order is paid as a down payment (DP) that starts the work, followed
//! by the remaining balance. This crate decides which stage a payment
//! belongs to and whether the amount is acceptable; the resulting
//! [`Settlement`] is applied to the order aggregate by the caller.

pub mod settlement;

pub use settlement::{
    AMOUNT_TOLERANCE, PaymentKind, PaymentRecord, Settlement, SettlementError, decide_settlement,
    expected_balance, expected_deposit, new_receipt_id,
};
