//! Pricing engine: deterministic price computation for a plan, billing
//! period, seat count, and optional promo code.
//!
//! The catalog lookups live in `calculate`; the arithmetic itself is the
//! pure `compute` function so the rounding rules can be tested without a
//! database. Promo codes apply only to monthly billing; the annual discount
//! and promo codes never combine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{BillingPeriod, Plan, PromoCode, PromoType};
use crate::money::{round_money, serialize_money, to_money_string};
use crate::repos::{plan_repo, promo_repo};

pub const ANNUAL_PROMO_NOTE: &str = "Annual discount cannot be combined with promo codes";

/// 17% discount applied to annual billing.
fn annual_discount_rate() -> Decimal {
    Decimal::new(17, 2)
}

/// Errors that can occur during price calculation
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Unknown plan: {0}")]
    PlanNotFound(String),

    #[error("Unknown promo code: {0}")]
    PromoNotFound(String),

    #[error("Promo code is inactive or expired: {0}")]
    PromoInactiveOrExpired(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pricing request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingInput {
    pub plan_code: String,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub seats: i32,
    pub promo_code: Option<String>,
}

/// Promo code echoed back when it contributed a discount
#[derive(Debug, Clone, Serialize)]
pub struct PromoApplied {
    pub code: String,
    #[serde(rename = "type")]
    pub promo_type: PromoType,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountBreakdown {
    #[serde(serialize_with = "serialize_money")]
    pub annual: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub promo: Decimal,
    pub promo_applied: Option<PromoApplied>,
    pub note: Option<String>,
}

/// The full pricing breakdown. The `plan_id`/`promo_code_id` fields carry the
/// catalog row ids for persistence and are not part of the serialized shape.
#[derive(Debug, Clone, Serialize)]
pub struct PricingResult {
    pub plan_code: String,
    pub billing_period: BillingPeriod,
    pub seats: i32,
    #[serde(serialize_with = "serialize_money")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub discount_total: Decimal,
    #[serde(serialize_with = "serialize_money")]
    pub total: Decimal,
    pub discounts: DiscountBreakdown,
    #[serde(skip)]
    pub plan_id: Uuid,
    #[serde(skip)]
    pub promo_code_id: Option<Uuid>,
}

/// Check that a promo code is usable at the moment of evaluation.
///
/// `now` is captured once per calculation so expiry is evaluated
/// consistently within a single call.
pub fn validate_promo(promo: &PromoCode, now: DateTime<Utc>) -> Result<(), PricingError> {
    let expired = promo.expires_at.map(|at| at < now).unwrap_or(false);
    if !promo.is_active || expired {
        return Err(PricingError::PromoInactiveOrExpired(promo.code.clone()));
    }
    Ok(())
}

/// Pure pricing arithmetic over already-resolved catalog rows.
///
/// `promo` must be pre-validated and is only honored for monthly billing;
/// `promo_requested` drives the explanatory note when an annual request
/// carried a promo code.
pub fn compute(
    plan: &Plan,
    promo: Option<&PromoCode>,
    billing_period: BillingPeriod,
    seats: i32,
    promo_requested: bool,
) -> PricingResult {
    let per_seat = plan.price_per_seat_monthly.unwrap_or(Decimal::ZERO);
    let subtotal = round_money(plan.base_price_monthly + per_seat * Decimal::from(seats));

    let is_annual = billing_period == BillingPeriod::Annual;

    let annual_discount = if is_annual {
        round_money(subtotal * annual_discount_rate())
    } else {
        Decimal::ZERO
    };

    let mut promo_discount = Decimal::ZERO;
    let mut promo_applied = None;
    let mut promo_code_id = None;

    if let Some(promo) = promo {
        if !is_annual {
            promo_discount = match promo.promo_type {
                PromoType::Percent => {
                    round_money(subtotal * promo.value / Decimal::ONE_HUNDRED)
                }
                PromoType::Fixed => round_money(promo.value),
            };
            promo_applied = Some(PromoApplied {
                code: promo.code.clone(),
                promo_type: promo.promo_type,
                value: match promo.promo_type {
                    PromoType::Percent => promo.value.normalize().to_string(),
                    PromoType::Fixed => to_money_string(promo.value),
                },
            });
            promo_code_id = Some(promo.id);
        }
    }

    let discount_total = round_money(annual_discount + promo_discount);
    let total = round_money(subtotal - discount_total).max(Decimal::ZERO);

    let note = if is_annual && promo_requested {
        Some(ANNUAL_PROMO_NOTE.to_string())
    } else {
        None
    };

    PricingResult {
        plan_code: plan.code.clone(),
        billing_period,
        seats,
        subtotal,
        discount_total,
        total,
        discounts: DiscountBreakdown {
            annual: annual_discount,
            promo: promo_discount,
            promo_applied,
            note,
        },
        plan_id: plan.id,
        promo_code_id,
    }
}

/// Resolve the plan (and promo code, when one applies) and compute the price.
///
/// Read-only: two catalog lookups, zero writes.
pub async fn calculate(pool: &PgPool, input: &PricingInput) -> Result<PricingResult, PricingError> {
    let plan = plan_repo::find_by_code(pool, &input.plan_code)
        .await?
        .ok_or_else(|| PricingError::PlanNotFound(input.plan_code.clone()))?;

    let is_annual = input.billing_period == BillingPeriod::Annual;

    // Promo codes are only resolved for monthly billing; an annual request
    // ignores the code entirely (it is never combined with the annual
    // discount, and an unknown code does not fail the request).
    let promo = match (&input.promo_code, is_annual) {
        (Some(code), false) => {
            let promo = promo_repo::find_by_code(pool, code)
                .await?
                .ok_or_else(|| PricingError::PromoNotFound(code.clone()))?;
            validate_promo(&promo, Utc::now())?;
            Some(promo)
        }
        _ => None,
    };

    Ok(compute(
        &plan,
        promo.as_ref(),
        input.billing_period,
        input.seats,
        input.promo_code.is_some(),
    ))
}
