//! Customer reviews of a completed job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tukangin_core::{DomainError, Entity, OrderId, ProfessionalId, ReviewId, UserId};

use crate::order::{Order, OrderStatus};

pub const MAX_COMMENT_LEN: usize = 1000;
pub const MAX_TAGS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Order not found")]
    NotOwner,
    #[error("Only completed orders can be reviewed")]
    NotReviewable,
    #[error("Professional does not match the order")]
    ProfessionalMismatch,
    #[error("Order has already been reviewed")]
    AlreadyReviewed,
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub order_id: OrderId,
    pub professional_id: ProfessionalId,
    pub rating: u8,
    pub comment: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub professional_id: ProfessionalId,
    pub user_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl NewReview {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=5).contains(&self.rating) {
            return Err(DomainError::validation("rating must be between 1 and 5"));
        }
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_COMMENT_LEN {
                return Err(DomainError::validation(format!(
                    "comment must be at most {MAX_COMMENT_LEN} characters"
                )));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(DomainError::validation(format!("at most {MAX_TAGS} tags are allowed")));
        }
        Ok(())
    }
}

impl Review {
    /// Accept a review for `order` from `user_id`.
    ///
    /// `already_reviewed` comes from the store; the store's unique key on
    /// the order id is the final guard.
    pub fn submit(
        order: &Order,
        user_id: UserId,
        input: NewReview,
        already_reviewed: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ReviewError> {
        if order.id != input.order_id || !order.is_owned_by(user_id) {
            return Err(ReviewError::NotOwner);
        }
        if !matches!(order.status, OrderStatus::Completed | OrderStatus::Warranty) {
            return Err(ReviewError::NotReviewable);
        }
        if order.professional_id != Some(input.professional_id) {
            return Err(ReviewError::ProfessionalMismatch);
        }
        if already_reviewed {
            return Err(ReviewError::AlreadyReviewed);
        }
        input.validate()?;

        let comment = input
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let tags = input
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            id: ReviewId::new(),
            order_id: input.order_id,
            professional_id: input.professional_id,
            user_id,
            rating: input.rating,
            comment,
            tags,
            created_at: now,
        })
    }
}
