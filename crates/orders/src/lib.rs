//! Booking orders domain module.
//!
//! Business rules for the order lifecycle, warranties and reviews,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod review;
pub mod validation;
pub mod warranty;

pub use order::{
    AddOn, Order, OrderCommand, OrderDetails, OrderEvent, OrderStatus, PlaceOrder, Pricing,
    WARRANTY_WINDOW_DAYS,
};
pub use review::{NewReview, Review, ReviewError};
pub use warranty::{ClaimError, ClaimStatus, NewClaim, Warranty, WarrantyClaim, WarrantyStatus};
