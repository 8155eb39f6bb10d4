//! Read-side projection of subscriptions for listing and detail views.
//!
//! Results are scoped strictly to the requesting owner; a subscription that
//! exists but belongs to someone else is indistinguishable from one that
//! does not exist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    BillingPeriod, PaymentProvider, PaymentStatus, PromoType, SubscriptionStatus,
};
use crate::money::{serialize_money, to_money_string};
use crate::repos::payment_repo;
use crate::repos::subscription_repo::{self, SubscriptionWithCatalog};
use crate::services::subscription_service::SubscriptionError;

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub code: String,
    #[serde(serialize_with = "serialize_money")]
    pub base_price: Decimal,
    pub price_per_seat: Option<String>,
    pub included_api_calls: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoSummary {
    pub code: String,
    #[serde(rename = "type")]
    pub promo_type: PromoType,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingSummary {
    #[serde(serialize_with = "serialize_money")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub discount_total: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetails {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    #[serde(serialize_with = "serialize_money")]
    pub amount: Decimal,
    pub currency: String,
    pub provider_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDetails {
    pub id: Uuid,
    pub status: SubscriptionStatus,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    pub provider: PaymentProvider,
    pub plan: PlanSummary,
    pub promo_code: Option<PromoSummary>,
    pub pricing: PricingSummary,
    /// Only the most recent payment attempt is projected.
    pub payment: Option<PaymentDetails>,
    pub created_at: DateTime<Utc>,
}

/// List all subscriptions owned by a user, newest first.
pub async fn find_all(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SubscriptionDetails>, SubscriptionError> {
    tracing::info!(user_id = %user_id, "List subscriptions");

    let rows = subscription_repo::find_for_user(pool, user_id).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in rows {
        details.push(project(pool, row).await?);
    }

    Ok(details)
}

/// Fetch a single subscription owned by the requesting user. Returns
/// `NotFound` for nonexistent and non-owned ids alike.
pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<SubscriptionDetails, SubscriptionError> {
    tracing::info!(id = %id, user_id = %user_id, "Get subscription");

    let row = subscription_repo::find_by_id_for_user(pool, id, user_id)
        .await?
        .ok_or(SubscriptionError::NotFound)?;

    project(pool, row).await
}

async fn project(
    pool: &PgPool,
    row: SubscriptionWithCatalog,
) -> Result<SubscriptionDetails, SubscriptionError> {
    let payment = payment_repo::latest_for_subscription(pool, row.id)
        .await?
        .map(|p| PaymentDetails {
            id: p.id,
            status: p.status,
            provider: p.provider,
            amount: p.amount,
            currency: p.currency,
            provider_ref: p.provider_ref,
            created_at: p.created_at,
        });

    let promo_code = match (row.promo_code, row.promo_type, row.promo_value) {
        (Some(code), Some(promo_type), Some(value)) => Some(PromoSummary {
            code,
            promo_type,
            value: match promo_type {
                PromoType::Percent => value.normalize().to_string(),
                PromoType::Fixed => to_money_string(value),
            },
        }),
        _ => None,
    };

    Ok(SubscriptionDetails {
        id: row.id,
        status: row.status,
        billing_period: row.billing_period,
        seats: row.seats,
        provider: row.provider,
        plan: PlanSummary {
            code: row.plan_code,
            base_price: row.base_price_monthly,
            price_per_seat: row.price_per_seat_monthly.map(to_money_string),
            included_api_calls: row.included_api_calls,
        },
        promo_code,
        pricing: PricingSummary {
            subtotal: row.price_subtotal,
            discount_total: row.discount_total,
            total: row.price_total,
        },
        payment,
        created_at: row.created_at,
    })
}
