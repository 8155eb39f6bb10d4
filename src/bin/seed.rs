//! Catalog seeder: upserts the reference plans, promo codes, and a pair of
//! demo users so the service can be exercised end to end.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use billing_rs::config::Config;
use billing_rs::db;

struct PlanSeed {
    code: &'static str,
    base_price_monthly: &'static str,
    price_per_seat_monthly: Option<&'static str>,
    included_api_calls: i32,
}

struct PromoSeed {
    code: &'static str,
    promo_type: &'static str,
    value: &'static str,
    is_active: bool,
}

struct UserSeed {
    email: &'static str,
    region: &'static str,
}

const PLANS: &[PlanSeed] = &[
    PlanSeed {
        code: "STARTER",
        base_price_monthly: "29.99",
        price_per_seat_monthly: None,
        included_api_calls: 1_000,
    },
    PlanSeed {
        code: "PROFESSIONAL",
        base_price_monthly: "99.49",
        price_per_seat_monthly: Some("15.75"),
        included_api_calls: 10_000,
    },
    PlanSeed {
        code: "ENTERPRISE",
        base_price_monthly: "299.90",
        price_per_seat_monthly: Some("12.30"),
        included_api_calls: 100_000,
    },
];

const PROMOS: &[PromoSeed] = &[
    PromoSeed {
        code: "WELCOME10",
        promo_type: "PERCENT",
        value: "10",
        is_active: true,
    },
    PromoSeed {
        code: "SAVE20",
        promo_type: "FIXED",
        value: "20",
        is_active: true,
    },
];

const USERS: &[UserSeed] = &[
    UserSeed {
        email: "demo-ua@example.com",
        region: "UA",
    },
    UserSeed {
        email: "demo-us@example.com",
        region: "US",
    },
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    seed(&pool).await.expect("Seed failed");

    let plans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plans")
        .fetch_one(&pool)
        .await
        .expect("Failed to count plans");
    let promos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM promo_codes")
        .fetch_one(&pool)
        .await
        .expect("Failed to count promo codes");

    tracing::info!(plans, promos, "Seed completed");
}

async fn seed(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for plan in PLANS {
        let per_seat: Option<Decimal> = plan
            .price_per_seat_monthly
            .map(|v| v.parse().expect("invalid seed price"));
        let base: Decimal = plan
            .base_price_monthly
            .parse()
            .expect("invalid seed price");

        sqlx::query(
            r#"
            INSERT INTO plans (id, code, base_price_monthly, price_per_seat_monthly, included_api_calls)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO UPDATE
            SET base_price_monthly = EXCLUDED.base_price_monthly,
                price_per_seat_monthly = EXCLUDED.price_per_seat_monthly,
                included_api_calls = EXCLUDED.included_api_calls
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan.code)
        .bind(base)
        .bind(per_seat)
        .bind(plan.included_api_calls)
        .execute(&mut *tx)
        .await?;
    }

    for promo in PROMOS {
        let value: Decimal = promo.value.parse().expect("invalid seed value");

        sqlx::query(
            r#"
            INSERT INTO promo_codes (id, code, promo_type, value, is_active, expires_at)
            VALUES ($1, $2, $3::promo_type, $4, $5, NULL)
            ON CONFLICT (code) DO UPDATE
            SET promo_type = EXCLUDED.promo_type,
                value = EXCLUDED.value,
                is_active = EXCLUDED.is_active,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(promo.code)
        .bind(promo.promo_type)
        .bind(value)
        .bind(promo.is_active)
        .execute(&mut *tx)
        .await?;
    }

    for user in USERS {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, region, is_active)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET region = EXCLUDED.region,
                is_active = TRUE
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email)
        .bind(user.region)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}
