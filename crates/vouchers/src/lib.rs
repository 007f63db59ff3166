//! Voucher domain module.
//!
//! Pure validation and discount computation (no IO). Usage counters are
//! incremented by the store together with the order that consumes them.

pub mod voucher;

pub use voucher::{
    Discount, DiscountType, NewVoucher, Voucher, VoucherError, evaluate, normalize_code,
};
