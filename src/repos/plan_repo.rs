use sqlx::PgPool;

use crate::models::Plan;

/// Find a plan by its unique code. Returns None if the plan doesn't exist.
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Plan>, sqlx::Error> {
    sqlx::query_as::<_, Plan>(
        r#"
        SELECT id, code, base_price_monthly, price_per_seat_monthly, included_api_calls, created_at
        FROM plans
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}
