//! Voucher check (customer) and voucher management (admin).

use chrono::Utc;
use tracing::info;

use tukangin_auth::{Identity, RoleRequirement};
use tukangin_core::Money;
use tukangin_events::EventBus;
use tukangin_vouchers::{NewVoucher, Voucher, VoucherError, normalize_code};

use super::{BookingService, ServiceError, ServiceResult};
use crate::cache::TAG_VOUCHERS;
use crate::events::{BookingEnvelope, BookingEvent};
use crate::store::{BookingStore, StoreError};

const VOUCHER_LIST_KEY: &str = "vouchers:list";

/// Outcome of a voucher check. An unusable voucher is a normal answer,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoucherCheck {
    Valid {
        voucher: Voucher,
        /// Present when the caller supplied a subtotal.
        discount: Option<Money>,
    },
    Invalid(VoucherError),
}

impl<S, B> BookingService<S, B>
where
    S: BookingStore + ?Sized,
    B: EventBus<BookingEnvelope> + ?Sized,
{
    /// Check whether the caller could use `code` right now. Read-only, so
    /// repeating a failed check yields the same failure.
    pub async fn check_voucher(
        &self,
        identity: &Identity,
        code: &str,
        subtotal: Option<Money>,
    ) -> ServiceResult<VoucherCheck> {
        let user = self.gate(identity, RoleRequirement::ANY).await?;

        let code = normalize_code(code);
        if code.is_empty() {
            return Err(ServiceError::validation("code is required"));
        }

        let Some(voucher) = self.store.find_voucher_by_code(&code).await? else {
            return Ok(VoucherCheck::Invalid(VoucherError::NotFound));
        };
        let usage = self.store.voucher_usage(voucher.id, user.user_id).await?;

        Ok(match voucher.check_usable(usage, Utc::now()) {
            Ok(()) => {
                let discount = subtotal.map(|s| voucher.discount_for(s));
                VoucherCheck::Valid { voucher, discount }
            }
            Err(reason) => VoucherCheck::Invalid(reason),
        })
    }

    pub async fn list_vouchers(&self, identity: &Identity) -> ServiceResult<Vec<Voucher>> {
        self.gate(identity, RoleRequirement::ADMIN).await?;

        if let Some(cached) = self.cache.get_as::<Vec<Voucher>>(VOUCHER_LIST_KEY) {
            return Ok(cached);
        }
        let ticket = self.cache.ticket();
        let vouchers = self.store.list_vouchers().await?;
        self.cache.put_as(ticket, VOUCHER_LIST_KEY, &[TAG_VOUCHERS], &vouchers);
        Ok(vouchers)
    }

    pub async fn create_voucher(&self, identity: &Identity, input: NewVoucher) -> ServiceResult<Voucher> {
        let admin = self.gate(identity, RoleRequirement::ADMIN).await?;

        let now = Utc::now();
        let voucher = Voucher::create(input, now)?;
        self.store.insert_voucher(&voucher).await.map_err(|err| match err {
            StoreError::Duplicate(_) => ServiceError::validation("Voucher code already exists"),
            other => other.into(),
        })?;
        info!(voucher_id = %voucher.id, code = %voucher.code, admin_id = %admin.user_id, "voucher created");

        self.publish(
            BookingEvent::VoucherCreated {
                voucher_id: voucher.id,
                code: voucher.code.clone(),
                occurred_at: now,
            },
            1,
        );
        Ok(voucher)
    }
}
