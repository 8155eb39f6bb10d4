use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    BillingPeriod, PaymentProvider, PromoType, Subscription, SubscriptionStatus,
};

/// Values for inserting a new subscription row
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub promo_code_id: Option<Uuid>,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    pub provider: PaymentProvider,
    pub price_subtotal: Decimal,
    pub discount_total: Decimal,
    pub price_total: Decimal,
}

/// Insert a subscription row (status PENDING) inside an open transaction.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewSubscription,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions
            (id, user_id, plan_id, promo_code_id, billing_period, seats, status,
             provider, price_subtotal, discount_total, price_total)
        VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7, $8, $9, $10)
        RETURNING id, user_id, plan_id, promo_code_id, billing_period, seats, status,
                  provider, price_subtotal, discount_total, price_total, created_at
        "#,
    )
    .bind(new.id)
    .bind(new.user_id)
    .bind(new.plan_id)
    .bind(new.promo_code_id)
    .bind(new.billing_period)
    .bind(new.seats)
    .bind(new.provider)
    .bind(new.price_subtotal)
    .bind(new.discount_total)
    .bind(new.price_total)
    .fetch_one(&mut **tx)
    .await
}

/// Subscription joined with its plan and optional promo code, for read-side
/// projections.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionWithCatalog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    pub price_subtotal: Decimal,
    pub discount_total: Decimal,
    pub price_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub plan_code: String,
    pub base_price_monthly: Decimal,
    pub price_per_seat_monthly: Option<Decimal>,
    pub included_api_calls: i32,
    pub promo_code: Option<String>,
    pub promo_type: Option<PromoType>,
    pub promo_value: Option<Decimal>,
}

const CATALOG_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.billing_period, s.seats, s.status, s.provider,
           s.price_subtotal, s.discount_total, s.price_total, s.created_at,
           p.code AS plan_code, p.base_price_monthly, p.price_per_seat_monthly,
           p.included_api_calls,
           pc.code AS promo_code, pc.promo_type AS promo_type, pc.value AS promo_value
    FROM subscriptions s
    JOIN plans p ON p.id = s.plan_id
    LEFT JOIN promo_codes pc ON pc.id = s.promo_code_id
"#;

/// Fetch all subscriptions owned by a user, newest first.
pub async fn find_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SubscriptionWithCatalog>, sqlx::Error> {
    let sql = format!("{} WHERE s.user_id = $1 ORDER BY s.created_at DESC", CATALOG_SELECT);
    sqlx::query_as::<_, SubscriptionWithCatalog>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Fetch a single subscription scoped to its owner. A non-owned id behaves
/// exactly like a nonexistent one.
pub async fn find_by_id_for_user(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<SubscriptionWithCatalog>, sqlx::Error> {
    let sql = format!("{} WHERE s.id = $1 AND s.user_id = $2", CATALOG_SELECT);
    sqlx::query_as::<_, SubscriptionWithCatalog>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
