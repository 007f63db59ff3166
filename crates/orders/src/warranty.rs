//! Post-service warranty and claims.
//!
//! A warranty exists for every order that reached COMPLETED or WARRANTY.
//! Claims are accepted while the warranty is ACTIVE and inside its window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tukangin_core::{ClaimId, DomainError, Entity, OrderId, UserId, WarrantyId};

use crate::order::{Order, OrderStatus, WARRANTY_WINDOW_DAYS};
use crate::validation;

pub const MIN_CLAIM_DESCRIPTION_LEN: usize = 10;
pub const MAX_EVIDENCE_URLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarrantyStatus {
    Active,
    Claimed,
    Expired,
}

impl WarrantyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyStatus::Active => "ACTIVE",
            WarrantyStatus::Claimed => "CLAIMED",
            WarrantyStatus::Expired => "EXPIRED",
        }
    }
}

impl core::str::FromStr for WarrantyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(WarrantyStatus::Active),
            "CLAIMED" => Ok(WarrantyStatus::Claimed),
            "EXPIRED" => Ok(WarrantyStatus::Expired),
            other => Err(DomainError::validation(format!("unknown warranty status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Submitted,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "SUBMITTED",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Warranty not found")]
    NotOwner,
    #[error("Warranty is not active")]
    NotActive,
    /// The warranty has been marked EXPIRED as a side effect; persist it.
    #[error("Warranty has expired")]
    Expired,
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warranty {
    pub id: WarrantyId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: WarrantyStatus,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Warranty {
    type Id = WarrantyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub description: String,
    pub evidence_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyClaim {
    pub id: ClaimId,
    pub warranty_id: WarrantyId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub description: String,
    pub evidence_urls: Vec<String>,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for WarrantyClaim {
    type Id = ClaimId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl NewClaim {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.description.trim().chars().count() < MIN_CLAIM_DESCRIPTION_LEN {
            return Err(DomainError::validation(format!(
                "description must be at least {MIN_CLAIM_DESCRIPTION_LEN} characters"
            )));
        }
        if self.evidence_urls.is_empty() {
            return Err(DomainError::validation("at least one evidence URL is required"));
        }
        validation::urls("evidenceUrls", &self.evidence_urls, MAX_EVIDENCE_URLS)
    }
}

impl Warranty {
    /// Warranty for an order that has just entered COMPLETED or WARRANTY.
    ///
    /// WARRANTY orders keep their own window; completed orders get
    /// [`WARRANTY_WINDOW_DAYS`] from completion.
    pub fn for_order(order: &Order, now: DateTime<Utc>) -> Option<Self> {
        let valid_until = match order.status {
            OrderStatus::Warranty => order.warranty_until?,
            OrderStatus::Completed => {
                order.completed_at.unwrap_or(now) + Duration::days(WARRANTY_WINDOW_DAYS)
            }
            _ => return None,
        };
        Some(Self {
            id: WarrantyId::new(),
            order_id: order.id,
            user_id: order.user_id,
            status: WarrantyStatus::Active,
            valid_until,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// File a claim against this warranty.
    ///
    /// On success the warranty is CLAIMED. A lapsed window flips the
    /// warranty to EXPIRED before returning [`ClaimError::Expired`].
    pub fn claim(
        &mut self,
        user_id: UserId,
        input: NewClaim,
        now: DateTime<Utc>,
    ) -> Result<WarrantyClaim, ClaimError> {
        if self.user_id != user_id {
            return Err(ClaimError::NotOwner);
        }
        if self.status != WarrantyStatus::Active {
            return Err(ClaimError::NotActive);
        }
        if self.is_expired(now) {
            self.status = WarrantyStatus::Expired;
            self.updated_at = now;
            return Err(ClaimError::Expired);
        }
        input.validate()?;

        self.status = WarrantyStatus::Claimed;
        self.updated_at = now;

        Ok(WarrantyClaim {
            id: ClaimId::new(),
            warranty_id: self.id,
            order_id: self.order_id,
            user_id,
            description: input.description.trim().to_string(),
            evidence_urls: input.evidence_urls,
            status: ClaimStatus::Submitted,
            created_at: now,
        })
    }
}
