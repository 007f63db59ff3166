//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | StoreError |
//! |------------|------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | RowNotFound | n/a | `NotFound` |
//! | anything else | n/a | `Backend` |
//!
//! Compare-and-swap failures are detected from `rows_affected() == 0` and
//! reported as `Conflict`.
//!
//! ## Atomicity
//!
//! Multi-record writes run in one transaction. Voucher redemption locks the
//! voucher row (`SELECT ... FOR UPDATE`) so concurrent orders for the same
//! voucher serialize on the limit checks.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use tukangin_auth::{Role, UserAccount};
use tukangin_core::{
    DomainError, ExpectedVersion, Money, OrderId, ProfessionalId, ReviewId, UserId,
    VoucherId, WarrantyId,
};
use tukangin_dispatch::Professional;
use tukangin_orders::{
    AddOn, Order, OrderDetails, OrderStatus, Pricing, Review, Warranty, WarrantyClaim,
    WarrantyStatus,
};
use tukangin_payments::{PaymentKind, PaymentRecord};
use tukangin_vouchers::{DiscountType, Voucher, VoucherError};

use super::{
    OrderStore, ProfessionalStore, ReviewStore, StoreError, StoreResult, UserStore, VoucherStore,
    WarrantyStore,
};

const SCHEMA: &str = include_str!("../../migrations/0001_booking.sql");

const USER_COLUMNS: &str = "id, email, display_name, role, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = r#"
    id, user_id, professional_id, status,
    receiver_name, receiver_phone, service, service_price, add_ons,
    address, description, attachments,
    subtotal, discount, total, voucher_id,
    paid_at, deposit_amount, balance_paid_at, balance_amount,
    completed_at, warranty_until, cancelled_at,
    created_at, updated_at, version
"#;

const VOUCHER_COLUMNS: &str = r#"
    id, code, is_active, discount_type, discount_value, max_discount,
    expiry_date, usage_limit, per_user_limit, used_count, created_at
"#;

const PROFESSIONAL_COLUMNS: &str =
    "id, name, speciality, photo_url, rating, review_count, total_jobs";

const WARRANTY_COLUMNS: &str =
    "id, order_id, user_id, status, valid_until, created_at, updated_at";

const REVIEW_COLUMNS: &str =
    "id, order_id, professional_id, user_id, rating, comment, tags, created_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user_if_absent(&self, user: &UserAccount) -> StoreResult<UserAccount> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        self.find_user(user.id).await?.ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &UserAccount) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, display_name = $3, role = $4, is_active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_order", e))?;
        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders_for_user", e))?;
        rows.iter().map(order_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }

    #[instrument(
        skip(self, order),
        fields(order_id = %order.id, voucher_id = ?order.voucher_id),
        err
    )]
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Dropping `tx` on an early return rolls the transaction back.
        if let Some(voucher_id) = order.voucher_id {
            let row = sqlx::query(
                "SELECT usage_limit, per_user_limit, used_count FROM vouchers WHERE id = $1 FOR UPDATE",
            )
            .bind(voucher_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_voucher", e))?
            .ok_or(StoreError::LimitReached(VoucherError::NotFound))?;

            let usage_limit: Option<i32> = get(&row, "usage_limit")?;
            let per_user_limit: Option<i32> = get(&row, "per_user_limit")?;
            let used_count: i32 = get(&row, "used_count")?;

            if matches!(usage_limit, Some(limit) if used_count >= limit) {
                return Err(StoreError::LimitReached(VoucherError::GlobalLimitReached));
            }

            if let Some(limit) = per_user_limit {
                let usage: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM orders WHERE voucher_id = $1 AND user_id = $2",
                )
                .bind(voucher_id.as_uuid())
                .bind(order.user_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("count_voucher_usage", e))?;
                if usage >= i64::from(limit) {
                    return Err(StoreError::LimitReached(VoucherError::UserLimitReached));
                }
            }

            sqlx::query("UPDATE vouchers SET used_count = used_count + 1 WHERE id = $1")
                .bind(voucher_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("increment_voucher_usage", e))?;
        }

        sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.professional_id.map(Uuid::from))
        .bind(order.status.as_str())
        .bind(&order.details.receiver_name)
        .bind(&order.details.receiver_phone)
        .bind(&order.details.service)
        .bind(amount_to_db(order.details.service_price)?)
        .bind(Json(&order.details.add_ons))
        .bind(&order.details.address)
        .bind(&order.details.description)
        .bind(Json(&order.details.attachments))
        .bind(amount_to_db(order.pricing.subtotal())?)
        .bind(amount_to_db(order.pricing.discount())?)
        .bind(amount_to_db(order.pricing.total())?)
        .bind(order.voucher_id.map(Uuid::from))
        .bind(order.paid_at)
        .bind(order.deposit_amount.map(amount_to_db).transpose()?)
        .bind(order.balance_paid_at)
        .bind(order.balance_amount.map(amount_to_db).transpose()?)
        .bind(order.completed_at)
        .bind(order.warranty_until)
        .bind(order.cancelled_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(version_to_db(order.version)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(
        skip(self, order, payment),
        fields(order_id = %order.id, version = order.version, expected = ?expected),
        err
    )]
    async fn update_order(
        &self,
        order: &Order,
        expected: ExpectedVersion,
        payment: Option<&PaymentRecord>,
    ) -> StoreResult<()> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(version_to_db(v)?),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                professional_id = $2,
                status = $3,
                paid_at = $4,
                deposit_amount = $5,
                balance_paid_at = $6,
                balance_amount = $7,
                completed_at = $8,
                warranty_until = $9,
                cancelled_at = $10,
                updated_at = $11,
                version = $12
            WHERE id = $1 AND ($13::BIGINT IS NULL OR version = $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.professional_id.map(Uuid::from))
        .bind(order.status.as_str())
        .bind(order.paid_at)
        .bind(order.deposit_amount.map(amount_to_db).transpose()?)
        .bind(order.balance_paid_at)
        .bind(order.balance_amount.map(amount_to_db).transpose()?)
        .bind(order.completed_at)
        .bind(order.warranty_until)
        .bind(order.cancelled_at)
        .bind(order.updated_at)
        .bind(version_to_db(order.version)?)
        .bind(expected_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                    .bind(order.id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("check_order_exists", e))?;
            return Err(if exists {
                StoreError::Conflict(format!(
                    "order {} changed concurrently (expected {expected:?})",
                    order.id
                ))
            } else {
                StoreError::NotFound
            });
        }

        if let Some(p) = payment {
            sqlx::query(
                r#"
                INSERT INTO payments (receipt_id, order_id, user_id, kind, amount, method, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&p.receipt_id)
            .bind(p.order_id.as_uuid())
            .bind(p.user_id.as_uuid())
            .bind(p.kind.as_str())
            .bind(amount_to_db(p.amount)?)
            .bind(&p.method)
            .bind(p.paid_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_payment", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(voucher_id = %voucher_id, user_id = %user_id), err)]
    async fn voucher_usage(&self, voucher_id: VoucherId, user_id: UserId) -> StoreResult<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE voucher_id = $1 AND user_id = $2")
                .bind(voucher_id.as_uuid())
                .bind(user_id.as_uuid())
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("voucher_usage", e))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn payments_for_order(&self, order_id: OrderId) -> StoreResult<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT receipt_id, order_id, user_id, kind, amount, method, paid_at
            FROM payments
            WHERE order_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("payments_for_order", e))?;
        rows.iter().map(payment_from_row).collect()
    }
}

#[async_trait]
impl VoucherStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn find_voucher_by_code(&self, code: &str) -> StoreResult<Option<Voucher>> {
        let row = sqlx::query(&format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = $1"))
            .bind(code)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_voucher_by_code", e))?;
        row.as_ref().map(voucher_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_vouchers(&self) -> StoreResult<Vec<Voucher>> {
        let rows = sqlx::query(&format!("SELECT {VOUCHER_COLUMNS} FROM vouchers ORDER BY code ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_vouchers", e))?;
        rows.iter().map(voucher_from_row).collect()
    }

    #[instrument(skip(self, voucher), fields(code = %voucher.code), err)]
    async fn insert_voucher(&self, voucher: &Voucher) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO vouchers ({VOUCHER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(voucher.id.as_uuid())
        .bind(&voucher.code)
        .bind(voucher.is_active)
        .bind(voucher.discount_type.map(|t| t.as_str()))
        .bind(amount_to_db(Money::new(voucher.discount_value))?)
        .bind(voucher.max_discount.map(amount_to_db).transpose()?)
        .bind(voucher.expiry_date)
        .bind(voucher.usage_limit.map(count_to_db).transpose()?)
        .bind(voucher.per_user_limit.map(count_to_db).transpose()?)
        .bind(count_to_db(voucher.used_count)?)
        .bind(voucher.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_voucher", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProfessionalStore for PostgresStore {
    #[instrument(skip(self), fields(professional_id = %id), err)]
    async fn find_professional(&self, id: ProfessionalId) -> StoreResult<Option<Professional>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_professional", e))?;
        row.as_ref().map(professional_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_professionals(&self) -> StoreResult<Vec<Professional>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROFESSIONAL_COLUMNS} FROM professionals ORDER BY name ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_professionals", e))?;
        rows.iter().map(professional_from_row).collect()
    }

    #[instrument(skip(self, professional), fields(professional_id = %professional.id), err)]
    async fn insert_professional(&self, professional: &Professional) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO professionals ({PROFESSIONAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        ))
        .bind(professional.id.as_uuid())
        .bind(&professional.name)
        .bind(&professional.speciality)
        .bind(&professional.photo_url)
        .bind(professional.rating)
        .bind(count_to_db(professional.review_count)?)
        .bind(count_to_db(professional.total_jobs)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_professional", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(professional_id = %id), err)]
    async fn record_completed_job(&self, id: ProfessionalId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE professionals SET total_jobs = total_jobs + 1 WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("record_completed_job", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WarrantyStore for PostgresStore {
    #[instrument(skip(self), fields(warranty_id = %id), err)]
    async fn find_warranty(&self, id: WarrantyId) -> StoreResult<Option<Warranty>> {
        let row = sqlx::query(&format!("SELECT {WARRANTY_COLUMNS} FROM warranties WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_warranty", e))?;
        row.as_ref().map(warranty_from_row).transpose()
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn find_warranty_for_order(&self, order_id: OrderId) -> StoreResult<Option<Warranty>> {
        let row = sqlx::query(&format!(
            "SELECT {WARRANTY_COLUMNS} FROM warranties WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_warranty_for_order", e))?;
        row.as_ref().map(warranty_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_warranties_for_user(&self, user_id: UserId) -> StoreResult<Vec<Warranty>> {
        let rows = sqlx::query(&format!(
            "SELECT {WARRANTY_COLUMNS} FROM warranties WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_warranties_for_user", e))?;
        rows.iter().map(warranty_from_row).collect()
    }

    #[instrument(skip(self, warranty), fields(warranty_id = %warranty.id), err)]
    async fn save_warranty(&self, warranty: &Warranty) -> StoreResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO warranties ({WARRANTY_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                valid_until = EXCLUDED.valid_until,
                updated_at = EXCLUDED.updated_at
            "#
        ))
        .bind(warranty.id.as_uuid())
        .bind(warranty.order_id.as_uuid())
        .bind(warranty.user_id.as_uuid())
        .bind(warranty.status.as_str())
        .bind(warranty.valid_until)
        .bind(warranty.created_at)
        .bind(warranty.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_warranty", e))?;
        Ok(())
    }

    #[instrument(skip(self, warranty, claim), fields(warranty_id = %warranty.id), err)]
    async fn record_claim(&self, warranty: &Warranty, claim: &WarrantyClaim) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query(
            "UPDATE warranties SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(warranty.id.as_uuid())
        .bind(warranty.status.as_str())
        .bind(warranty.updated_at)
        .bind(WarrantyStatus::Active.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("claim_warranty", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "warranty {} is no longer active",
                warranty.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO warranty_claims
                (id, warranty_id, order_id, user_id, description, evidence_urls, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(claim.id.as_uuid())
        .bind(claim.warranty_id.as_uuid())
        .bind(claim.order_id.as_uuid())
        .bind(claim.user_id.as_uuid())
        .bind(&claim.description)
        .bind(Json(&claim.evidence_urls))
        .bind(claim.status.as_str())
        .bind(claim.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_claim", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn find_review_for_order(&self, order_id: OrderId) -> StoreResult<Option<Review>> {
        let row = sqlx::query(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE order_id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_review_for_order", e))?;
        row.as_ref().map(review_from_row).transpose()
    }

    #[instrument(skip(self, review), fields(order_id = %review.order_id), err)]
    async fn insert_review(&self, review: &Review) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(review.id.as_uuid())
        .bind(review.order_id.as_uuid())
        .bind(review.professional_id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(Json(&review.tags))
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_review", e))?;

        let result = sqlx::query(
            r#"
            UPDATE professionals SET
                rating = (rating * review_count + $2) / (review_count + 1),
                review_count = review_count + 1
            WHERE id = $1
            "#,
        )
        .bind(review.professional_id.as_uuid())
        .bind(f64::from(review.rating))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_professional_rating", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("{} failed: {}", operation, other)),
    }
}

// Row mapping

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to decode column {column}: {e}")))
}

fn parse<T>(column: &str, value: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|e: DomainError| StoreError::Backend(format!("bad value in {column}: {e}")))
}

fn amount_to_db(amount: Money) -> StoreResult<i64> {
    i64::try_from(amount.amount())
        .map_err(|_| StoreError::Backend(format!("amount {amount} does not fit BIGINT")))
}

fn amount_from_db(value: i64) -> StoreResult<Money> {
    u64::try_from(value)
        .map(Money::new)
        .map_err(|_| StoreError::Backend(format!("negative amount {value}")))
}

fn count_to_db(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("count {value} does not fit INTEGER")))
}

fn count_from_db(value: i32) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("negative count {value}")))
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} does not fit BIGINT")))
}

fn user_from_row(row: &PgRow) -> StoreResult<UserAccount> {
    let role: String = get(row, "role")?;
    Ok(UserAccount {
        id: UserId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        display_name: get(row, "display_name")?,
        role: parse::<Role>("role", &role)?,
        is_active: get(row, "is_active")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let status: String = get(row, "status")?;
    let add_ons: Json<Vec<AddOn>> = get(row, "add_ons")?;
    let attachments: Json<Vec<String>> = get(row, "attachments")?;
    let professional_id: Option<Uuid> = get(row, "professional_id")?;
    let voucher_id: Option<Uuid> = get(row, "voucher_id")?;
    let deposit_amount: Option<i64> = get(row, "deposit_amount")?;
    let balance_amount: Option<i64> = get(row, "balance_amount")?;
    let version: i64 = get(row, "version")?;

    Ok(Order {
        id: OrderId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        professional_id: professional_id.map(ProfessionalId::from_uuid),
        status: parse::<OrderStatus>("status", &status)?,
        details: OrderDetails {
            receiver_name: get(row, "receiver_name")?,
            receiver_phone: get(row, "receiver_phone")?,
            service: get(row, "service")?,
            service_price: amount_from_db(get(row, "service_price")?)?,
            add_ons: add_ons.0,
            address: get(row, "address")?,
            description: get(row, "description")?,
            attachments: attachments.0,
        },
        pricing: Pricing::new(
            amount_from_db(get(row, "subtotal")?)?,
            amount_from_db(get(row, "discount")?)?,
        ),
        voucher_id: voucher_id.map(VoucherId::from_uuid),
        paid_at: get(row, "paid_at")?,
        deposit_amount: deposit_amount.map(amount_from_db).transpose()?,
        balance_paid_at: get(row, "balance_paid_at")?,
        balance_amount: balance_amount.map(amount_from_db).transpose()?,
        completed_at: get(row, "completed_at")?,
        warranty_until: get(row, "warranty_until")?,
        cancelled_at: get(row, "cancelled_at")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        version: u64::try_from(version)
            .map_err(|_| StoreError::Backend(format!("negative version {version}")))?,
    })
}

fn payment_from_row(row: &PgRow) -> StoreResult<PaymentRecord> {
    let kind: String = get(row, "kind")?;
    Ok(PaymentRecord {
        receipt_id: get(row, "receipt_id")?,
        order_id: OrderId::from_uuid(get(row, "order_id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        kind: parse::<PaymentKind>("kind", &kind)?,
        amount: amount_from_db(get(row, "amount")?)?,
        method: get(row, "method")?,
        paid_at: get(row, "paid_at")?,
    })
}

fn voucher_from_row(row: &PgRow) -> StoreResult<Voucher> {
    let discount_type: Option<String> = get(row, "discount_type")?;
    let max_discount: Option<i64> = get(row, "max_discount")?;
    let usage_limit: Option<i32> = get(row, "usage_limit")?;
    let per_user_limit: Option<i32> = get(row, "per_user_limit")?;

    Ok(Voucher {
        id: VoucherId::from_uuid(get(row, "id")?),
        code: get(row, "code")?,
        is_active: get(row, "is_active")?,
        discount_type: discount_type
            .as_deref()
            .map(|t| parse::<DiscountType>("discount_type", t))
            .transpose()?,
        discount_value: amount_from_db(get(row, "discount_value")?)?.amount(),
        max_discount: max_discount.map(amount_from_db).transpose()?,
        expiry_date: get(row, "expiry_date")?,
        usage_limit: usage_limit.map(count_from_db).transpose()?,
        per_user_limit: per_user_limit.map(count_from_db).transpose()?,
        used_count: count_from_db(get(row, "used_count")?)?,
        created_at: get(row, "created_at")?,
    })
}

fn professional_from_row(row: &PgRow) -> StoreResult<Professional> {
    Ok(Professional {
        id: ProfessionalId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        speciality: get(row, "speciality")?,
        photo_url: get(row, "photo_url")?,
        rating: get(row, "rating")?,
        review_count: count_from_db(get(row, "review_count")?)?,
        total_jobs: count_from_db(get(row, "total_jobs")?)?,
    })
}

fn warranty_from_row(row: &PgRow) -> StoreResult<Warranty> {
    let status: String = get(row, "status")?;
    Ok(Warranty {
        id: WarrantyId::from_uuid(get(row, "id")?),
        order_id: OrderId::from_uuid(get(row, "order_id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        status: parse::<WarrantyStatus>("status", &status)?,
        valid_until: get(row, "valid_until")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    let rating: i16 = get(row, "rating")?;
    let tags: Json<Vec<String>> = get(row, "tags")?;
    Ok(Review {
        id: ReviewId::from_uuid(get(row, "id")?),
        order_id: OrderId::from_uuid(get(row, "order_id")?),
        professional_id: ProfessionalId::from_uuid(get(row, "professional_id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        rating: u8::try_from(rating)
            .map_err(|_| StoreError::Backend(format!("rating {rating} out of range")))?,
        comment: get(row, "comment")?,
        tags: tags.0,
        created_at: get(row, "created_at")?,
    })
}
