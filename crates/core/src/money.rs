//! Integer currency amounts.
//!
//! All amounts are in the smallest currency unit (rupiah). No floating-point
//! arithmetic is used for money anywhere in the workspace.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Non-negative amount in the smallest currency unit.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub const fn amount(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn checked_sub(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount underflow"))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    /// `floor(self * percent / 100)`, computed in 128-bit to avoid overflow.
    pub fn percent_floor(self, percent: u64) -> Money {
        let value = (self.0 as u128 * percent as u128) / 100;
        Money(u64::try_from(value).unwrap_or(u64::MAX))
    }

    /// Half of the amount, rounded half-up (`round(x * 0.5)`).
    pub fn half_rounded(self) -> Money {
        Money(self.0 / 2 + self.0 % 2)
    }

    pub fn abs_diff(self, other: Money) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// True when `self` lies within `tolerance` units of `expected`.
    pub fn within(self, expected: Money, tolerance: u64) -> bool {
        self.abs_diff(expected) <= tolerance
    }

    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 { self } else { other }
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Rp{}", self.0)
    }
}

impl From<u64> for Money {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
