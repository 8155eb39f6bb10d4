use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Enums (match database enum types)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_period", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BillingPeriod {
    Monthly,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "promo_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PromoType {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_provider", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentProvider {
    Monobank,
    Pix,
    Stripe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Created,
    Succeeded,
    Failed,
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub region: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub code: String,
    pub base_price_monthly: Decimal,
    pub price_per_seat_monthly: Option<Decimal>,
    pub included_api_calls: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub promo_type: PromoType,
    pub value: Decimal,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub promo_code_id: Option<Uuid>,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    pub price_subtotal: Decimal,
    pub discount_total: Decimal,
    pub price_total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: String,
    pub provider_ref: Option<String>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: Uuid,
    pub plan_code: String,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub seats: i32,
    pub promo_code: Option<String>,
}

// ============================================================================
// Error
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_period_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&BillingPeriod::Monthly).unwrap(),
            "\"MONTHLY\""
        );
        assert_eq!(
            serde_json::to_string(&BillingPeriod::Annual).unwrap(),
            "\"ANNUAL\""
        );
    }

    #[test]
    fn create_request_defaults_seats_to_zero() {
        let req: CreateSubscriptionRequest = serde_json::from_str(
            r#"{"user_id":"3fa85f64-5717-4562-b3fc-2c963f66afa6","plan_code":"STARTER","billing_period":"MONTHLY"}"#,
        )
        .unwrap();
        assert_eq!(req.seats, 0);
        assert!(req.promo_code.is_none());
    }
}
