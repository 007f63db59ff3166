use chrono::Utc;
use tracing::info;

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_events::EventBus;
use tukangin_orders::{NewReview, Review};

use super::{BookingService, ServiceError, ServiceResult};
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::{BookingStore, StoreError};

const ALREADY_REVIEWED: &str = "Order has already been reviewed";

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    /// One review per finished order, by its owner, for the assigned
    /// professional. The professional's rating is updated in the same write.
    pub async fn submit_review(&self, identity: &Identity, input: NewReview) -> ServiceResult<Review> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let order = self.owned_order(user.user_id, input.order_id).await?;

        let already_reviewed = self.store.find_review_for_order(order.id).await?.is_some();
        let now = Utc::now();
        let review = Review::submit(&order, user.user_id, input, already_reviewed, now)?;

        self.store.insert_review(&review).await.map_err(|err| match err {
            StoreError::Duplicate(_) => ServiceError::validation(ALREADY_REVIEWED),
            StoreError::NotFound => ServiceError::not_found("Professional"),
            other => other.into(),
        })?;
        info!(
            review_id = %review.id,
            order_id = %review.order_id,
            professional_id = %review.professional_id,
            rating = review.rating,
            "review submitted"
        );

        self.publish(
            BookingEvent::ReviewSubmitted {
                review_id: review.id,
                order_id: review.order_id,
                professional_id: review.professional_id,
                rating: review.rating,
                occurred_at: now,
            },
            1,
        );
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::PaymentRequest;
    use super::*;

    use tukangin_core::{Money, OrderId, ProfessionalId};
    use tukangin_dispatch::NewProfessional;
    use tukangin_orders::OrderStatus;

    use crate::store::ProfessionalStore;

    async fn completed_order(svc: &TestService, me: &Identity) -> (OrderId, ProfessionalId) {
        let boss = admin(svc).await;
        let order = svc.place_order(me, new_order(100_000, None)).await.unwrap();
        svc.settle_payment(
            me,
            order.id,
            PaymentRequest {
                amount: Money::new(50_000),
                payment_method: "cash".into(),
            },
        )
        .await
        .unwrap();
        let pro = svc
            .create_professional(
                &boss,
                NewProfessional {
                    name: "Bu Rina".into(),
                    speciality: "Plumbing".into(),
                    photo_url: None,
                },
            )
            .await
            .unwrap();
        svc.assign_professional(&boss, order.id, pro.id).await.unwrap();
        svc.set_order_status(&boss, order.id, OrderStatus::Completed).await.unwrap();
        (order.id, pro.id)
    }

    fn review(order_id: OrderId, professional_id: ProfessionalId, rating: u8) -> NewReview {
        NewReview {
            order_id,
            professional_id,
            rating,
            comment: Some("  Rapi dan cepat  ".into()),
            tags: vec!["tepat waktu".into()],
        }
    }

    #[tokio::test]
    async fn review_updates_professional_rating_once() {
        let svc = service();
        let me = customer(&svc).await;
        let (order_id, pro_id) = completed_order(&svc, &me).await;

        let submitted = svc.submit_review(&me, review(order_id, pro_id, 4)).await.unwrap();
        assert_eq!(submitted.comment.as_deref(), Some("Rapi dan cepat"));

        let pro = svc.store().find_professional(pro_id).await.unwrap().unwrap();
        assert_eq!(pro.review_count, 1);
        assert_eq!(pro.rating, 4.0);
        assert_eq!(pro.total_jobs, 1);

        let err = svc.submit_review(&me, review(order_id, pro_id, 5)).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation(ALREADY_REVIEWED.into()));
    }

    #[tokio::test]
    async fn pending_orders_cannot_be_reviewed() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        let err = svc
            .submit_review(&me, review(order.id, ProfessionalId::new(), 5))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation("Only completed orders can be reviewed".into()));
    }

    #[tokio::test]
    async fn rating_out_of_range_is_rejected() {
        let svc = service();
        let me = customer(&svc).await;
        let (order_id, pro_id) = completed_order(&svc, &me).await;

        let err = svc.submit_review(&me, review(order_id, pro_id, 6)).await.unwrap_err();
        assert_eq!(err, ServiceError::Validation("rating must be between 1 and 5".into()));
    }

    #[tokio::test]
    async fn suspended_user_cannot_review() {
        let svc = service();
        let me = customer(&svc).await;
        let (order_id, pro_id) = completed_order(&svc, &me).await;
        suspend(&svc, &me).await;

        let err = svc.submit_review(&me, review(order_id, pro_id, 5)).await.unwrap_err();
        assert_eq!(err, ServiceError::SuspensionBlocked);
    }
}
