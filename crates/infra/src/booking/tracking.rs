//! Assignment and live-tracking read model.

use chrono::Utc;

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_core::OrderId;
use tukangin_dispatch::{Assignment, Tracking};
use tukangin_events::EventBus;

use super::{BookingService, ServiceResult};
use crate::events::BookingEnvelope;
use crate::store::BookingStore;

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    pub async fn assignment(&self, identity: &Identity, order_id: OrderId) -> ServiceResult<Assignment> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let order = self.owned_order(user.user_id, order_id).await?;

        let professional = match order.professional_id {
            Some(id) => self.store.find_professional(id).await?,
            None => None,
        };
        Ok(Assignment::for_order(&order, professional.as_ref()))
    }

    /// Live only while the order is PROCESSING.
    pub async fn tracking(&self, identity: &Identity, order_id: OrderId) -> ServiceResult<Tracking> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;
        let order = self.owned_order(user.user_id, order_id).await?;
        Ok(Tracking::for_order(&order, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{PaymentRequest, ServiceError};
    use super::*;

    use tukangin_core::Money;
    use tukangin_dispatch::NewProfessional;
    use tukangin_orders::OrderStatus;

    #[tokio::test]
    async fn tracking_is_live_only_while_processing() {
        let svc = service();
        let me = customer(&svc).await;
        let boss = admin(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        assert_eq!(svc.tracking(&me, order.id).await.unwrap(), Tracking::Disabled);

        svc.settle_payment(
            &me,
            order.id,
            PaymentRequest {
                amount: Money::new(50_000),
                payment_method: "ewallet".into(),
            },
        )
        .await
        .unwrap();
        match svc.tracking(&me, order.id).await.unwrap() {
            Tracking::Live(view) => assert_eq!(view.status, OrderStatus::Processing),
            Tracking::Disabled => panic!("tracking should be live while processing"),
        }

        svc.set_order_status(&boss, order.id, OrderStatus::Completed).await.unwrap();
        assert_eq!(svc.tracking(&me, order.id).await.unwrap(), Tracking::Disabled);
    }

    #[tokio::test]
    async fn assignment_joins_the_professional_profile() {
        let svc = service();
        let me = customer(&svc).await;
        let boss = admin(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();

        assert_eq!(svc.assignment(&me, order.id).await.unwrap(), Assignment::Unassigned);

        let pro = svc
            .create_professional(
                &boss,
                NewProfessional {
                    name: "Pak Joko".into(),
                    speciality: "AC".into(),
                    photo_url: None,
                },
            )
            .await
            .unwrap();
        svc.assign_professional(&boss, order.id, pro.id).await.unwrap();

        match svc.assignment(&me, order.id).await.unwrap() {
            Assignment::Assigned(view) => {
                assert_eq!(view.mitra.id, pro.id);
                assert_eq!(view.mitra.name, "Pak Joko");
            }
            Assignment::Unassigned => panic!("expected an assigned professional"),
        }
    }

    #[tokio::test]
    async fn suspended_user_cannot_track() {
        let svc = service();
        let me = customer(&svc).await;
        let order = svc.place_order(&me, new_order(100_000, None)).await.unwrap();
        suspend(&svc, &me).await;

        assert_eq!(
            svc.tracking(&me, order.id).await.unwrap_err(),
            ServiceError::SuspensionBlocked
        );
    }
}
