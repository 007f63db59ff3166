//! `PostgresStore` against a live database.
//!
//! Ignored by default; run with `DATABASE_URL` pointing at a scratch
//! database and `--ignored`. Every test uses fresh ids and voucher codes,
//! so runs can share one database.

use chrono::Utc;

use tukangin_auth::{Identity, UserAccount};
use tukangin_core::{Aggregate, ExpectedVersion, Money, OrderId, UserId, VoucherId};
use tukangin_infra::store::{OrderStore, UserStore, VoucherStore};
use tukangin_infra::{PostgresStore, StoreError};
use tukangin_orders::{Order, OrderCommand, OrderDetails, PlaceOrder};
use tukangin_vouchers::{Discount, DiscountType, NewVoucher, Voucher, VoucherError};

async fn store() -> PostgresStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres tests");
    let store = PostgresStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    store
}

async fn user(store: &PostgresStore) -> UserId {
    let user_id = UserId::new();
    let account = UserAccount::provision(&Identity::new(user_id), Utc::now());
    store.insert_user_if_absent(&account).await.unwrap();
    user_id
}

async fn voucher(store: &PostgresStore, usage_limit: Option<u32>) -> Voucher {
    // The tail of a v7 id is random; the head is a timestamp.
    let id = VoucherId::new().to_string();
    let code = format!("PG-{}", &id[id.len() - 12..]);
    let voucher = Voucher::create(
        NewVoucher {
            code,
            discount_type: DiscountType::Flat,
            discount_value: 10_000,
            max_discount: None,
            expiry_date: None,
            usage_limit,
            per_user_limit: None,
        },
        Utc::now(),
    )
    .unwrap();
    store.insert_voucher(&voucher).await.unwrap();
    voucher
}

fn order(user_id: UserId, voucher_id: Option<VoucherId>) -> Order {
    let id = OrderId::new();
    let mut order = Order::empty(id);
    order
        .execute(&OrderCommand::Place(PlaceOrder {
            order_id: id,
            user_id,
            details: OrderDetails {
                receiver_name: "Ani".into(),
                receiver_phone: "081311112222".into(),
                service: "cleaning".into(),
                service_price: Money::new(100_000),
                add_ons: vec![],
                address: "Jl. Asia Afrika 8".into(),
                description: "Bersih-bersih rumah".into(),
                attachments: vec![],
            },
            discount: voucher_id.map(|voucher_id| Discount {
                voucher_id,
                amount: Money::new(10_000),
            }),
            occurred_at: Utc::now(),
        }))
        .unwrap();
    order
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_redemptions_respect_the_usage_limit() {
    let store = store().await;
    let v = voucher(&store, Some(1)).await;
    let a = order(user(&store).await, Some(v.id));
    let b = order(user(&store).await, Some(v.id));

    let (ra, rb) = tokio::join!(store.insert_order(&a), store.insert_order(&b));
    let results = [ra, rb];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    assert!(
        results
            .iter()
            .any(|r| *r == Err(StoreError::LimitReached(VoucherError::GlobalLimitReached)))
    );

    let stored = store.find_voucher_by_code(&v.code).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);

    let persisted = [
        store.find_order(a.id).await.unwrap().is_some(),
        store.find_order(b.id).await.unwrap().is_some(),
    ];
    assert_eq!(persisted.iter().filter(|p| **p).count(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn stale_order_update_is_a_conflict() {
    let store = store().await;
    let placed = order(user(&store).await, None);
    store.insert_order(&placed).await.unwrap();

    let mut first = placed.clone();
    first.execute(&OrderCommand::Cancel { occurred_at: Utc::now() }).unwrap();
    store
        .update_order(&first, ExpectedVersion::Exact(placed.version), None)
        .await
        .unwrap();

    let mut second = placed.clone();
    second
        .execute(&OrderCommand::SettleDeposit { amount: Money::new(50_000), occurred_at: Utc::now() })
        .unwrap();
    let err = store
        .update_order(&second, ExpectedVersion::Exact(placed.version), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "{err:?}");

    let stored = store.find_order(placed.id).await.unwrap().unwrap();
    assert_eq!(stored.status, first.status);
    assert_eq!(stored.version, first.version);
}
