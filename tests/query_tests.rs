//! Read-side projection tests: ownership scoping, ordering, and the
//! latest-payment projection. Requires DATABASE_URL; tests skip when unset.

mod common;

use billing_rs::models::{BillingPeriod, CreateSubscriptionRequest};
use billing_rs::providers::MockGatewayFactory;
use billing_rs::services::query_service;
use billing_rs::services::subscription_service::{self, SubscriptionError};

use common::{insert_plan, insert_promo, insert_user, try_test_pool, unique};

async fn create_subscription(
    pool: &sqlx::PgPool,
    user_id: uuid::Uuid,
    plan_code: &str,
    promo_code: Option<String>,
) -> uuid::Uuid {
    let req = CreateSubscriptionRequest {
        user_id,
        plan_code: plan_code.to_string(),
        billing_period: BillingPeriod::Monthly,
        seats: 1,
        promo_code,
    };
    subscription_service::create(pool, &MockGatewayFactory, &req, &unique("key"))
        .await
        .expect("create failed")
        .subscription_id
}

#[tokio::test]
async fn find_by_id_masks_ownership() {
    let Some(pool) = try_test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let owner = insert_user(&pool, "US").await;
    let stranger = insert_user(&pool, "US").await;
    let plan_code = insert_plan(&pool, "29.99", None).await;
    let id = create_subscription(&pool, owner, &plan_code, None).await;

    // Owner sees it.
    let details = query_service::find_by_id(&pool, id, owner)
        .await
        .expect("owner lookup failed");
    assert_eq!(details.id, id);

    // A different user gets the same NotFound as a nonexistent id.
    let err = query_service::find_by_id(&pool, id, stranger).await.unwrap_err();
    assert!(matches!(err, SubscriptionError::NotFound));

    let err = query_service::find_by_id(&pool, uuid::Uuid::new_v4(), owner)
        .await
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::NotFound));
}

#[tokio::test]
async fn find_all_is_scoped_and_newest_first() {
    let Some(pool) = try_test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let user_id = insert_user(&pool, "US").await;
    let other = insert_user(&pool, "US").await;
    let plan_code = insert_plan(&pool, "29.99", None).await;

    let first = create_subscription(&pool, user_id, &plan_code, None).await;
    let second = create_subscription(&pool, user_id, &plan_code, None).await;
    create_subscription(&pool, other, &plan_code, None).await;

    let list = query_service::find_all(&pool, user_id)
        .await
        .expect("list failed");

    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, second);
    assert_eq!(list[1].id, first);
    assert!(list.iter().all(|s| s.payment.is_some()));
}

#[tokio::test]
async fn detail_projects_catalog_and_latest_payment() {
    let Some(pool) = try_test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };

    let user_id = insert_user(&pool, "US").await;
    let plan_code = insert_plan(&pool, "99.49", Some("15.75")).await;
    let promo_code = insert_promo(&pool, "PERCENT", "10", true, None).await;
    let id = create_subscription(&pool, user_id, &plan_code, Some(promo_code.clone())).await;

    let details = query_service::find_by_id(&pool, id, user_id)
        .await
        .expect("lookup failed");

    assert_eq!(details.plan.code, plan_code);
    assert_eq!(details.plan.price_per_seat.as_deref(), Some("15.75"));
    let promo = details.promo_code.expect("promo missing from projection");
    assert_eq!(promo.code, promo_code);
    assert_eq!(promo.value, "10");

    // subtotal 115.24, promo 11.52, total 103.72
    assert_eq!(details.pricing.subtotal, common::dec("115.24"));
    assert_eq!(details.pricing.discount_total, common::dec("11.52"));
    assert_eq!(details.pricing.total, common::dec("103.72"));

    let original_payment = details.payment.expect("payment missing");

    // A later payment attempt becomes the projected one.
    let newer_id = uuid::Uuid::new_v4();
    sqlx::query(
        "INSERT INTO payments (id, subscription_id, provider, status, amount, currency, provider_ref, idempotency_key, created_at)
         VALUES ($1, $2, 'STRIPE', 'CREATED', $3, 'USD', 'stripe_retry', $4, NOW() + interval '1 second')",
    )
    .bind(newer_id)
    .bind(id)
    .bind(common::dec("103.72"))
    .bind(unique("key"))
    .execute(&pool)
    .await
    .expect("failed to insert retry payment");

    let details = query_service::find_by_id(&pool, id, user_id)
        .await
        .expect("lookup failed");
    let projected = details.payment.expect("payment missing");
    assert_eq!(projected.id, newer_id);
    assert_ne!(projected.id, original_payment.id);
}
