use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tukangin_core::{DomainError, Entity, Money, VoucherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    Percent,
    Flat,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "PERCENT",
            DiscountType::Flat => "FLAT",
        }
    }

    /// Compatibility shim for voucher rows written before the type column
    /// existed: values above 100 can only be flat amounts.
    pub fn infer_legacy(discount_value: u64) -> Self {
        if discount_value > 100 {
            DiscountType::Flat
        } else {
            DiscountType::Percent
        }
    }
}

impl core::str::FromStr for DiscountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERCENT" => Ok(DiscountType::Percent),
            "FLAT" => Ok(DiscountType::Flat),
            other => Err(DomainError::validation(format!("unknown discount type '{other}'"))),
        }
    }
}

/// Why a voucher cannot be applied. Messages are shown to customers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VoucherError {
    #[error("Voucher not found")]
    NotFound,
    #[error("Voucher is no longer active")]
    Inactive,
    #[error("Voucher has expired")]
    Expired,
    #[error("Voucher usage limit has been reached")]
    GlobalLimitReached,
    #[error("You have reached the usage limit for this voucher")]
    UserLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    pub is_active: bool,
    /// `None` only for legacy rows; see [`DiscountType::infer_legacy`].
    pub discount_type: Option<DiscountType>,
    pub discount_value: u64,
    pub max_discount: Option<Money>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: Option<u32>,
    pub used_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Entity for Voucher {
    type Id = VoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Admin input for a new voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVoucher {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: u64,
    pub max_discount: Option<Money>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: Option<u32>,
}

/// Computed discount for a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discount {
    pub voucher_id: VoucherId,
    pub amount: Money,
}

/// Canonical form of a voucher code (codes are case-insensitive).
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl Voucher {
    pub fn create(input: NewVoucher, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let code = normalize_code(&input.code);
        if code.is_empty() {
            return Err(DomainError::validation("voucher code must not be empty"));
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(DomainError::validation(
                "voucher code may only contain letters, digits, '-' and '_'",
            ));
        }
        match input.discount_type {
            DiscountType::Percent if !(1..=100).contains(&input.discount_value) => {
                return Err(DomainError::validation("percent discount must be between 1 and 100"));
            }
            DiscountType::Flat if input.discount_value == 0 => {
                return Err(DomainError::validation("flat discount must be positive"));
            }
            _ => {}
        }
        if input.usage_limit == Some(0) || input.per_user_limit == Some(0) {
            return Err(DomainError::validation("usage limits must be positive when set"));
        }

        Ok(Self {
            id: VoucherId::new(),
            code,
            is_active: true,
            discount_type: Some(input.discount_type),
            discount_value: input.discount_value,
            max_discount: input.max_discount,
            expiry_date: input.expiry_date,
            usage_limit: input.usage_limit,
            per_user_limit: input.per_user_limit,
            used_count: 0,
            created_at: now,
        })
    }

    pub fn effective_type(&self) -> DiscountType {
        self.discount_type
            .unwrap_or_else(|| DiscountType::infer_legacy(self.discount_value))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < now)
    }

    pub fn global_limit_reached(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.used_count >= limit)
    }

    pub fn user_limit_reached(&self, user_usage: u32) -> bool {
        matches!(self.per_user_limit, Some(limit) if user_usage >= limit)
    }

    /// Usability checks in evaluation order; no discount computed.
    pub fn check_usable(&self, user_usage: u32, now: DateTime<Utc>) -> Result<(), VoucherError> {
        if !self.is_active {
            return Err(VoucherError::Inactive);
        }
        if self.is_expired(now) {
            return Err(VoucherError::Expired);
        }
        if self.global_limit_reached() {
            return Err(VoucherError::GlobalLimitReached);
        }
        if self.user_limit_reached(user_usage) {
            return Err(VoucherError::UserLimitReached);
        }
        Ok(())
    }

    /// Discount for `subtotal`, clamped to `max_discount` and to `subtotal`.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.effective_type() {
            DiscountType::Percent => subtotal.percent_floor(self.discount_value),
            DiscountType::Flat => Money::new(self.discount_value),
        };
        let capped = match self.max_discount {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        capped.min(subtotal)
    }
}

/// Validate a looked-up voucher for a user and compute its discount.
///
/// `user_usage` is the number of the user's prior orders referencing the
/// voucher. Nothing is mutated here; the caller persists the usage together
/// with the order.
pub fn evaluate(
    voucher: Option<&Voucher>,
    user_usage: u32,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<Discount, VoucherError> {
    let voucher = voucher.ok_or(VoucherError::NotFound)?;
    voucher.check_usable(user_usage, now)?;
    Ok(Discount {
        voucher_id: voucher.id,
        amount: voucher.discount_for(subtotal),
    })
}
