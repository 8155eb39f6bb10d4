//! Payment storage, including the idempotency ledger lookups.
//!
//! The `payments.idempotency_key` unique constraint is the source of truth
//! for duplicate-request detection; this module exposes the lookup used for
//! early dedup and race recovery, plus the classifier for the constraint
//! violation itself.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    BillingPeriod, Payment, PaymentProvider, PaymentStatus, SubscriptionStatus,
};

/// Name of the unique constraint on payments.idempotency_key (see migrations).
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "payments_idempotency_key_key";

/// Values for inserting a new payment row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub provider: PaymentProvider,
    pub amount: Decimal,
    pub currency: String,
    pub idempotency_key: String,
}

/// Insert a payment row (status CREATED, provider_ref NULL) inside an open
/// transaction. Fails with a unique violation if the idempotency key is
/// already taken.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewPayment,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (id, subscription_id, provider, status, amount, currency, provider_ref, idempotency_key)
        VALUES ($1, $2, $3, 'CREATED', $4, $5, NULL, $6)
        RETURNING id, subscription_id, provider, status, amount, currency,
                  provider_ref, idempotency_key, created_at
        "#,
    )
    .bind(new.id)
    .bind(new.subscription_id)
    .bind(new.provider)
    .bind(new.amount)
    .bind(&new.currency)
    .bind(&new.idempotency_key)
    .fetch_one(&mut **tx)
    .await
}

/// Payment joined with its subscription and catalog codes, as needed by the
/// replay and recovery paths.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentWithSubscription {
    pub payment_id: Uuid,
    pub payment_status: PaymentStatus,
    pub provider: PaymentProvider,
    pub amount: Decimal,
    pub currency: String,
    pub provider_ref: Option<String>,
    pub idempotency_key: String,
    pub subscription_id: Uuid,
    pub subscription_status: SubscriptionStatus,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    pub plan_code: String,
    pub promo_code: Option<String>,
    pub user_region: String,
}

/// Look up the payment (with its subscription) recorded for an idempotency
/// key. This is the dedup check on request entry and the recovery read after
/// a unique-constraint race.
pub async fn find_by_idempotency_key(
    pool: &PgPool,
    idempotency_key: &str,
) -> Result<Option<PaymentWithSubscription>, sqlx::Error> {
    sqlx::query_as::<_, PaymentWithSubscription>(
        r#"
        SELECT pay.id AS payment_id, pay.status AS payment_status, pay.provider,
               pay.amount, pay.currency, pay.provider_ref, pay.idempotency_key,
               s.id AS subscription_id, s.status AS subscription_status,
               s.billing_period, s.seats,
               p.code AS plan_code, pc.code AS promo_code,
               u.region AS user_region
        FROM payments pay
        JOIN subscriptions s ON s.id = pay.subscription_id
        JOIN plans p ON p.id = s.plan_id
        JOIN users u ON u.id = s.user_id
        LEFT JOIN promo_codes pc ON pc.id = s.promo_code_id
        WHERE pay.idempotency_key = $1
        "#,
    )
    .bind(idempotency_key)
    .fetch_optional(pool)
    .await
}

/// Attach the provider reference returned by the gateway to a payment row.
pub async fn set_provider_ref(
    pool: &PgPool,
    payment_id: Uuid,
    provider_ref: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET provider_ref = $1
        WHERE id = $2
        "#,
    )
    .bind(provider_ref)
    .bind(payment_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent payment attempt for a subscription, if any.
pub async fn latest_for_subscription(
    pool: &PgPool,
    subscription_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, subscription_id, provider, status, amount, currency,
               provider_ref, idempotency_key, created_at
        FROM payments
        WHERE subscription_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(subscription_id)
    .fetch_optional(pool)
    .await
}

/// Classify whether an error is a unique violation on the idempotency-key
/// constraint specifically, as opposed to any other storage failure. The
/// orchestrator converts exactly these errors into the replay path.
pub fn is_idempotency_key_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(IDEMPOTENCY_KEY_CONSTRAINT)
        }
        _ => false,
    }
}
