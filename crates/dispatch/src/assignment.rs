use serde::Serialize;

use tukangin_core::{OrderId, ProfessionalId};
use tukangin_orders::Order;

use crate::Professional;

/// Fixed arrival estimate until real routing exists.
pub const ESTIMATED_ARRIVAL: &str = "30-45 minutes";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedProfessional {
    pub id: ProfessionalId,
    pub name: String,
    pub rating: f64,
    pub total_jobs: u32,
    pub photo_url: Option<String>,
    pub speciality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentView {
    pub order_id: OrderId,
    pub mitra: AssignedProfessional,
    pub estimated_arrival: &'static str,
}

/// Who is assigned to an order. `Unassigned` is a normal answer, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Assigned(AssignmentView),
    Unassigned,
}

impl Assignment {
    /// `professional` is the profile looked up for `order.professional_id`.
    /// A dangling id (profile removed) reads as unassigned.
    pub fn for_order(order: &Order, professional: Option<&Professional>) -> Self {
        match (order.professional_id, professional) {
            (Some(id), Some(p)) if p.id == id => Assignment::Assigned(AssignmentView {
                order_id: order.id,
                mitra: AssignedProfessional {
                    id: p.id,
                    name: p.name.clone(),
                    rating: p.display_rating(),
                    total_jobs: p.total_jobs,
                    photo_url: p.photo_url.clone(),
                    speciality: p.speciality.clone(),
                },
                estimated_arrival: ESTIMATED_ARRIVAL,
            }),
            _ => Assignment::Unassigned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewProfessional;

    fn pro() -> Professional {
        Professional::create(NewProfessional {
            name: "Pak Joko".into(),
            speciality: "Listrik".into(),
            photo_url: None,
        })
        .unwrap()
    }

    #[test]
    fn unassigned_order() {
        let order = Order::empty(OrderId::new());
        assert_eq!(Assignment::for_order(&order, None), Assignment::Unassigned);
    }

    #[test]
    fn assigned_order_joins_profile() {
        let p = pro();
        let mut order = Order::empty(OrderId::new());
        order.professional_id = Some(p.id);

        match Assignment::for_order(&order, Some(&p)) {
            Assignment::Assigned(view) => {
                assert_eq!(view.mitra.name, "Pak Joko");
                assert_eq!(view.estimated_arrival, ESTIMATED_ARRIVAL);
            }
            Assignment::Unassigned => panic!("expected assignment"),
        }
    }

    #[test]
    fn mismatched_profile_is_unassigned() {
        let mut order = Order::empty(OrderId::new());
        order.professional_id = Some(ProfessionalId::new());
        assert_eq!(Assignment::for_order(&order, Some(&pro())), Assignment::Unassigned);
    }
}
