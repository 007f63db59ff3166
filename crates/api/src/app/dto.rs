use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use tukangin_auth::{Role, UserAccount};
use tukangin_core::{Money, OrderId, ProfessionalId, WarrantyId};
use tukangin_dispatch::{NewProfessional, Professional};
use tukangin_infra::booking::{NewOrder, OrderWithPayments};
use tukangin_orders::{AddOn, NewClaim, NewReview, Order, OrderDetails, OrderStatus, Review, Warranty};
use tukangin_payments::PaymentRecord;
use tukangin_vouchers::{DiscountType, NewVoucher, Voucher};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddOnRequest {
    pub name: String,
    pub price: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub receiver_name: String,
    pub receiver_phone: String,
    pub service: String,
    /// Catalog price, supplied by the client.
    pub service_price: u64,
    #[serde(default)]
    pub add_ons: Vec<AddOnRequest>,
    pub address: String,
    pub description: String,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl From<CreateOrderRequest> for NewOrder {
    fn from(body: CreateOrderRequest) -> Self {
        NewOrder {
            details: OrderDetails {
                receiver_name: body.receiver_name,
                receiver_phone: body.receiver_phone,
                service: body.service,
                service_price: Money::new(body.service_price),
                add_ons: body
                    .add_ons
                    .into_iter()
                    .map(|a| AddOn {
                        name: a.name,
                        price: Money::new(a.price),
                    })
                    .collect(),
                address: body.address,
                description: body.description,
                attachments: body.attachments,
            },
            voucher_code: body.voucher_code.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Payment body keeps the snake_case field names the payment widget sends.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentRequest {
    pub amount: u64,
    pub payment_method: String,
    /// Gateway token; accepted and ignored until a gateway is wired in.
    #[serde(default)]
    pub payment_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewRequest {
    pub order_id: OrderId,
    pub professional_id: ProfessionalId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<ReviewRequest> for NewReview {
    fn from(body: ReviewRequest) -> Self {
        NewReview {
            order_id: body.order_id,
            professional_id: body.professional_id,
            rating: body.rating,
            comment: body.comment,
            tags: body.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VoucherCheckRequest {
    pub code: String,
    /// When present the response includes the discount it would yield.
    #[serde(default)]
    pub subtotal: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimRequest {
    pub warranty_id: WarrantyId,
    pub issue_description: String,
    pub evidence_photos: Vec<String>,
}

impl ClaimRequest {
    pub fn into_parts(self) -> (WarrantyId, NewClaim) {
        (
            self.warranty_id,
            NewClaim {
                description: self.issue_description,
                evidence_urls: self.evidence_photos,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRequest {
    pub professional_id: ProfessionalId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProfessionalRequest {
    pub name: String,
    pub speciality: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl From<CreateProfessionalRequest> for NewProfessional {
    fn from(body: CreateProfessionalRequest) -> Self {
        NewProfessional {
            name: body.name,
            speciality: body.speciality,
            photo_url: body.photo_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVoucherRequest {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: u64,
    #[serde(default)]
    pub max_discount: Option<u64>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub per_user_limit: Option<u32>,
}

impl From<CreateVoucherRequest> for NewVoucher {
    fn from(body: CreateVoucherRequest) -> Self {
        NewVoucher {
            code: body.code,
            discount_type: body.discount_type,
            discount_value: body.discount_value,
            max_discount: body.max_discount.map(Money::new),
            expiry_date: body.expiry_date,
            usage_limit: body.usage_limit,
            per_user_limit: body.per_user_limit,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn order_to_json(order: &Order) -> serde_json::Value {
    json!({
        "id": order.id.to_string(),
        "userId": order.user_id.to_string(),
        "professionalId": order.professional_id.map(|id| id.to_string()),
        "status": order.status.as_str(),
        "receiverName": order.details.receiver_name,
        "receiverPhone": order.details.receiver_phone,
        "service": order.details.service,
        "servicePrice": order.details.service_price.amount(),
        "addOns": order.details.add_ons.iter().map(|a| json!({
            "name": a.name,
            "price": a.price.amount(),
        })).collect::<Vec<_>>(),
        "address": order.details.address,
        "description": order.details.description,
        "attachments": order.details.attachments,
        "subtotal": order.pricing.subtotal().amount(),
        "discount": order.pricing.discount().amount(),
        "total": order.pricing.total().amount(),
        "voucherId": order.voucher_id.map(|id| id.to_string()),
        "paidAt": order.paid_at,
        "depositAmount": order.deposit_amount.map(|m| m.amount()),
        "balancePaidAt": order.balance_paid_at,
        "balanceAmount": order.balance_amount.map(|m| m.amount()),
        "fullyPaid": order.is_fully_paid(),
        "completedAt": order.completed_at,
        "warrantyUntil": order.warranty_until,
        "cancelledAt": order.cancelled_at,
        "createdAt": order.created_at,
        "updatedAt": order.updated_at,
        "version": order.version,
    })
}

pub fn payment_to_json(payment: &PaymentRecord) -> serde_json::Value {
    json!({
        "receiptId": payment.receipt_id,
        "kind": payment.kind.as_str(),
        "amount": payment.amount.amount(),
        "method": payment.method,
        "paidAt": payment.paid_at,
    })
}

pub fn order_with_payments_to_json(view: &OrderWithPayments) -> serde_json::Value {
    let mut body = order_to_json(&view.order);
    body["payments"] = view.payments.iter().map(payment_to_json).collect();
    body
}

pub fn voucher_to_json(voucher: &Voucher) -> serde_json::Value {
    json!({
        "id": voucher.id.to_string(),
        "code": voucher.code,
        "isActive": voucher.is_active,
        "discountType": voucher.effective_type().as_str(),
        "discountValue": voucher.discount_value,
        "maxDiscount": voucher.max_discount.map(|m| m.amount()),
        "expiryDate": voucher.expiry_date,
        "usageLimit": voucher.usage_limit,
        "perUserLimit": voucher.per_user_limit,
        "usedCount": voucher.used_count,
        "createdAt": voucher.created_at,
    })
}

pub fn user_to_json(user: &UserAccount) -> serde_json::Value {
    json!({
        "id": user.id.to_string(),
        "email": user.email,
        "name": user.display_name,
        "role": user.role.as_str(),
        "isActive": user.is_active,
        "createdAt": user.created_at,
        "updatedAt": user.updated_at,
    })
}

pub fn professional_to_json(p: &Professional) -> serde_json::Value {
    json!({
        "id": p.id.to_string(),
        "name": p.name,
        "speciality": p.speciality,
        "photoUrl": p.photo_url,
        "rating": p.display_rating(),
        "reviewCount": p.review_count,
        "totalJobs": p.total_jobs,
    })
}

pub fn warranty_to_json(w: &Warranty) -> serde_json::Value {
    json!({
        "id": w.id.to_string(),
        "orderId": w.order_id.to_string(),
        "status": w.status.as_str(),
        "validUntil": w.valid_until,
        "createdAt": w.created_at,
    })
}

pub fn review_to_json(r: &Review) -> serde_json::Value {
    json!({
        "success": true,
        "reviewId": r.id.to_string(),
        "createdAt": r.created_at,
        "message": "Review submitted",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_order_body_rejects_unknown_fields() {
        let body = json!({
            "receiverName": "Budi",
            "receiverPhone": "081234567890",
            "service": "ac-service",
            "servicePrice": 200000,
            "address": "Jl. Sudirman 10",
            "description": "AC tidak dingin",
            "total": 1,
        });
        assert!(serde_json::from_value::<CreateOrderRequest>(body).is_err());
    }

    #[test]
    fn blank_voucher_code_means_no_voucher() {
        let body: CreateOrderRequest = serde_json::from_value(json!({
            "receiverName": "Budi",
            "receiverPhone": "081234567890",
            "service": "ac-service",
            "servicePrice": 200000,
            "addOns": [{"name": "freon", "price": 50000}],
            "address": "Jl. Sudirman 10",
            "description": "AC tidak dingin",
            "voucherCode": "  ",
        }))
        .unwrap();

        let order = NewOrder::from(body);
        assert_eq!(order.voucher_code, None);
        assert_eq!(order.details.subtotal().unwrap(), Money::new(250_000));
    }

    #[test]
    fn payment_body_uses_snake_case_fields() {
        let body: PaymentRequest = serde_json::from_value(json!({
            "amount": 50000,
            "payment_method": "QRIS",
            "payment_token": "tok_1",
        }))
        .unwrap();
        assert_eq!(body.amount, 50_000);
        assert_eq!(body.payment_method, "QRIS");
    }
}
