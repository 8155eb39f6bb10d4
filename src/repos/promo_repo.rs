use sqlx::PgPool;

use crate::models::PromoCode;

/// Find a promo code by its unique code. Returns None if it doesn't exist.
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<PromoCode>, sqlx::Error> {
    sqlx::query_as::<_, PromoCode>(
        r#"
        SELECT id, code, promo_type, value, is_active, expires_at, created_at
        FROM promo_codes
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}
