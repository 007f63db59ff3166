//! Admin dashboard operations. Every method requires ADMIN or DEVELOPER.

use chrono::Utc;
use tracing::{info, warn};

use tukangin_auth::{Identity, Role, RoleRequirement, UserAccount};
use tukangin_core::{Aggregate, OrderId, ProfessionalId, UserId};
use tukangin_dispatch::{NewProfessional, Professional};
use tukangin_events::EventBus;
use tukangin_orders::{Order, OrderCommand, OrderStatus};

use super::{BookingService, ServiceError, ServiceResult};
use crate::cache::{TAG_PROFESSIONALS, TAG_USERS};
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::BookingStore;

const USER_LIST_KEY: &str = "users:list";
const PROFESSIONAL_LIST_KEY: &str = "professionals:list";

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    pub async fn list_users(&self, identity: &Identity) -> ServiceResult<Vec<UserAccount>> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        if let Some(cached) = self.cache.get_as::<Vec<UserAccount>>(USER_LIST_KEY) {
            return Ok(cached);
        }
        let ticket = self.cache.ticket();
        let users = self.store.list_users().await?;
        self.cache.put_as(ticket, USER_LIST_KEY, &[TAG_USERS], &users);
        Ok(users)
    }

    pub async fn suspend_user(&self, identity: &Identity, target: UserId) -> ServiceResult<UserAccount> {
        let admin = self.gate(identity, RoleRequirement::ADMIN).await?;
        let mut account = self.user(target).await?;

        if account.suspend(admin.user_id, Utc::now())? {
            self.save_user(&account).await?;
            info!(user_id = %account.id, admin_id = %admin.user_id, "user suspended");
        }
        Ok(account)
    }

    pub async fn reactivate_user(&self, identity: &Identity, target: UserId) -> ServiceResult<UserAccount> {
        let admin = self.gate(identity, RoleRequirement::ADMIN).await?;
        let mut account = self.user(target).await?;

        if account.reactivate(Utc::now()) {
            self.save_user(&account).await?;
            info!(user_id = %account.id, admin_id = %admin.user_id, "user reactivated");
        }
        Ok(account)
    }

    pub async fn change_role(&self, identity: &Identity, target: UserId, role: Role) -> ServiceResult<UserAccount> {
        let admin = self.gate(identity, RoleRequirement::ADMIN).await?;
        let mut account = self.user(target).await?;

        account.change_role(admin.user_id, role, Utc::now())?;
        self.save_user(&account).await?;
        info!(user_id = %account.id, role = role.as_str(), admin_id = %admin.user_id, "role changed");
        Ok(account)
    }

    async fn user(&self, id: UserId) -> ServiceResult<UserAccount> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn save_user(&self, account: &UserAccount) -> ServiceResult<()> {
        self.store.update_user(account).await?;
        self.publish(
            BookingEvent::UserStatusChanged {
                user_id: account.id,
                is_active: account.is_active,
                role: account.role,
                occurred_at: account.updated_at,
            },
            1,
        );
        Ok(())
    }

    /// Ops status edit: COMPLETED, WARRANTY or CANCELLED.
    ///
    /// Completion and warranty also maintain the order's warranty record.
    /// The first completion credits the assigned professional with a
    /// finished job; returning to COMPLETED from WARRANTY does not.
    pub async fn set_order_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        status: OrderStatus,
    ) -> ServiceResult<Order> {
        let admin = self.gate(identity, RoleRequirement::ADMIN).await?;

        let now = Utc::now();
        let command = match status {
            OrderStatus::Completed => OrderCommand::Complete { occurred_at: now },
            OrderStatus::Warranty => OrderCommand::StartWarranty { occurred_at: now },
            OrderStatus::Cancelled => OrderCommand::Cancel { occurred_at: now },
            OrderStatus::Pending | OrderStatus::Processing => {
                return Err(ServiceError::validation(
                    "status must be one of COMPLETED, WARRANTY, CANCELLED",
                ));
            }
        };

        let mut order = self.any_order(order_id).await?;
        let previous = order.version;
        let first_completion = order.completed_at.is_none();
        order.execute(&command)?;
        self.save_order(&order, previous, None).await?;
        info!(order_id = %order.id, status = %order.status, admin_id = %admin.user_id, "order status changed");

        // The status change is stored; follow-ups are logged, not returned.
        if matches!(order.status, OrderStatus::Completed | OrderStatus::Warranty) {
            if let Err(err) = self.ensure_warranty(&order, now).await {
                warn!(order_id = %order.id, error = %err, "failed to maintain warranty record");
            }
        }
        if order.status == OrderStatus::Completed && first_completion {
            if let Some(professional_id) = order.professional_id {
                if let Err(err) = self.store.record_completed_job(professional_id).await {
                    warn!(%professional_id, error = %err, "failed to credit completed job");
                }
            }
        }

        self.publish(
            BookingEvent::OrderStatusChanged {
                order_id: order.id,
                user_id: order.user_id,
                status: order.status,
                occurred_at: now,
            },
            order.version,
        );
        Ok(order)
    }

    pub async fn assign_professional(
        &self,
        identity: &Identity,
        order_id: OrderId,
        professional_id: ProfessionalId,
    ) -> ServiceResult<Order> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        if self.store.find_professional(professional_id).await?.is_none() {
            return Err(ServiceError::not_found("Professional"));
        }

        let mut order = self.any_order(order_id).await?;
        let previous = order.version;
        let now = Utc::now();
        order.execute(&OrderCommand::AssignProfessional { professional_id, occurred_at: now })?;
        self.save_order(&order, previous, None).await?;
        info!(order_id = %order.id, %professional_id, "professional assigned");

        self.publish(
            BookingEvent::ProfessionalAssigned {
                order_id: order.id,
                user_id: order.user_id,
                professional_id,
                occurred_at: now,
            },
            order.version,
        );
        Ok(order)
    }

    pub async fn list_professionals(&self, identity: &Identity) -> ServiceResult<Vec<Professional>> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        if let Some(cached) = self.cache.get_as::<Vec<Professional>>(PROFESSIONAL_LIST_KEY) {
            return Ok(cached);
        }
        let ticket = self.cache.ticket();
        let professionals = self.store.list_professionals().await?;
        self.cache.put_as(ticket, PROFESSIONAL_LIST_KEY, &[TAG_PROFESSIONALS], &professionals);
        Ok(professionals)
    }

    pub async fn create_professional(
        &self,
        identity: &Identity,
        input: NewProfessional,
    ) -> ServiceResult<Professional> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        let professional = Professional::create(input)?;
        self.store.insert_professional(&professional).await?;
        info!(professional_id = %professional.id, name = %professional.name, "professional added");

        self.publish(
            BookingEvent::ProfessionalAdded {
                professional_id: professional.id,
                occurred_at: Utc::now(),
            },
            1,
        );
        Ok(professional)
    }
}
