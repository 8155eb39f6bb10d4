//! Shared test utilities: singleton database pool and catalog fixtures.
//!
//! Integration tests talk to a real Postgres instance via `DATABASE_URL`.
//! When the variable is not set the tests skip themselves rather than fail,
//! so the unit suite stays runnable without infrastructure.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use billing_rs::db::init_pool;
use billing_rs::providers::{GatewayFactory, PaymentGateway, PaymentInit, ProviderError};

static TEST_POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Get the shared test pool, or None when DATABASE_URL is not configured.
pub async fn try_test_pool() -> Option<PgPool> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    if std::env::var("DB_MAX_CONNECTIONS").is_err() {
        std::env::set_var("DB_MAX_CONNECTIONS", "5");
    }
    if std::env::var("DB_ACQUIRE_TIMEOUT_SECS").is_err() {
        std::env::set_var("DB_ACQUIRE_TIMEOUT_SECS", "10");
    }

    let pool = TEST_POOL
        .get_or_init(|| async {
            let pool = init_pool(&database_url)
                .await
                .expect("Failed to connect to test database");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");
            pool
        })
        .await
        .clone();

    Some(pool)
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Unique per-test suffix so fixtures never collide across runs.
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub async fn insert_user(pool: &PgPool, region: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, region, is_active) VALUES ($1, $2, $3, TRUE)")
        .bind(id)
        .bind(format!("{}@example.com", unique("user")))
        .bind(region)
        .execute(pool)
        .await
        .expect("Failed to insert test user");
    id
}

pub async fn insert_plan(pool: &PgPool, base: &str, per_seat: Option<&str>) -> String {
    let code = unique("PLAN");
    sqlx::query(
        "INSERT INTO plans (id, code, base_price_monthly, price_per_seat_monthly, included_api_calls)
         VALUES ($1, $2, $3, $4, 1000)",
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(dec(base))
    .bind(per_seat.map(dec))
    .execute(pool)
    .await
    .expect("Failed to insert test plan");
    code
}

pub async fn insert_promo(
    pool: &PgPool,
    promo_type: &str,
    value: &str,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
) -> String {
    let code = unique("PROMO");
    sqlx::query(
        "INSERT INTO promo_codes (id, code, promo_type, value, is_active, expires_at)
         VALUES ($1, $2, $3::promo_type, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(promo_type)
    .bind(dec(value))
    .bind(is_active)
    .bind(expires_at)
    .execute(pool)
    .await
    .expect("Failed to insert test promo");
    code
}

pub async fn payments_for_key(pool: &PgPool, idempotency_key: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE idempotency_key = $1")
        .bind(idempotency_key)
        .fetch_one(pool)
        .await
        .expect("Failed to count payments")
}

pub async fn subscriptions_for_user(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count subscriptions")
}

pub async fn provider_ref_for_key(pool: &PgPool, idempotency_key: &str) -> Option<String> {
    sqlx::query_scalar("SELECT provider_ref FROM payments WHERE idempotency_key = $1")
        .bind(idempotency_key)
        .fetch_one(pool)
        .await
        .expect("Failed to fetch provider_ref")
}

// ============================================================================
// Gateway test doubles
// ============================================================================

/// Gateway that always returns the same reference, without a checkout URL.
pub struct ScriptedGateway {
    pub provider_ref: String,
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn init_payment(
        &self,
        _amount: Decimal,
        _currency: &str,
    ) -> Result<PaymentInit, ProviderError> {
        Ok(PaymentInit {
            provider_ref: self.provider_ref.clone(),
            checkout_url: None,
        })
    }
}

pub struct ScriptedFactory {
    pub provider_ref: String,
}

impl GatewayFactory for ScriptedFactory {
    fn for_region(&self, _region: &str) -> Box<dyn PaymentGateway> {
        Box::new(ScriptedGateway {
            provider_ref: self.provider_ref.clone(),
        })
    }
}

/// Gateway that fails every initiation, simulating a provider outage.
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn init_payment(
        &self,
        _amount: Decimal,
        _currency: &str,
    ) -> Result<PaymentInit, ProviderError> {
        Err(ProviderError::InitiationFailed(
            "provider unavailable".to_string(),
        ))
    }
}

pub struct FailingFactory;

impl GatewayFactory for FailingFactory {
    fn for_region(&self, _region: &str) -> Box<dyn PaymentGateway> {
        Box::new(FailingGateway)
    }
}
