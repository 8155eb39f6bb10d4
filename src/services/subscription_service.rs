//! Subscription creation orchestrator.
//!
//! A creation attempt moves through: dedup check -> pricing -> atomic
//! insert of subscription + payment (provider_ref NULL) -> gateway call
//! outside the transaction -> provider_ref update -> response. Whenever a
//! payment already exists for the idempotency key, the attempt takes the
//! replay path instead; a found payment with no provider reference first
//! goes through recovery, which completes the missing gateway call.
//!
//! Correctness under concurrent duplicate submissions comes entirely from
//! the unique constraint on payments.idempotency_key: losers of the insert
//! race observe the constraint violation and replay the winner's row.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    CreateSubscriptionRequest, PaymentProvider, PaymentStatus, SubscriptionStatus, User,
};
use crate::pricing::{self, PricingError, PricingInput, PricingResult};
use crate::providers::{
    checkout_url_from_provider_ref, provider_by_region, GatewayFactory, ProviderError,
};
use crate::repos::payment_repo::{self, NewPayment, PaymentWithSubscription};
use crate::repos::subscription_repo::{self, NewSubscription};
use crate::repos::user_repo;

/// All payments settle in a single fixed currency; multi-currency conversion
/// is out of scope.
pub const SETTLEMENT_CURRENCY: &str = "USD";

/// Errors surfaced by subscription creation and lookup
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Idempotency-Key header is required")]
    MissingIdempotencyKey,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error(transparent)]
    ProviderInitiationFailed(#[from] ProviderError),

    #[error("Recovery could not establish a provider reference for idempotency key {0}")]
    RecoveryInconsistency(String),

    #[error("Subscription not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub provider_ref: String,
    pub checkout_url: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSubscriptionResponse {
    pub subscription_id: Uuid,
    pub status: SubscriptionStatus,
    pub provider: PaymentProvider,
    pub price: PricingResult,
    pub payment: PaymentSummary,
    pub idempotent_replay: bool,
}

/// Create a subscription (or replay a previous creation) for an idempotency
/// key.
///
/// Duplicate requests with the same key, sequential or concurrent, resolve
/// to the single persisted subscription/payment pair; the response marks
/// those with `idempotent_replay = true`.
pub async fn create(
    pool: &PgPool,
    gateways: &dyn GatewayFactory,
    req: &CreateSubscriptionRequest,
    idempotency_key: &str,
) -> Result<CreateSubscriptionResponse, SubscriptionError> {
    if idempotency_key.trim().is_empty() {
        return Err(SubscriptionError::MissingIdempotencyKey);
    }

    tracing::info!(
        user_id = %req.user_id,
        plan_code = %req.plan_code,
        billing_period = ?req.billing_period,
        seats = req.seats,
        promo_code = ?req.promo_code,
        idempotency_key,
        "Create subscription request"
    );

    // Dedup check: an existing payment for this key means a prior attempt
    // already won; return its result instead of writing anything.
    if let Some(existing) = payment_repo::find_by_idempotency_key(pool, idempotency_key).await? {
        return replay(pool, gateways, existing).await;
    }

    let user = user_repo::find_by_id(pool, req.user_id)
        .await?
        .ok_or(SubscriptionError::UserNotFound(req.user_id))?;

    let pricing = pricing::calculate(
        pool,
        &PricingInput {
            plan_code: req.plan_code.clone(),
            billing_period: req.billing_period,
            seats: req.seats,
            promo_code: req.promo_code.clone(),
        },
    )
    .await?;

    tracing::info!(
        plan_code = %pricing.plan_code,
        subtotal = %pricing.subtotal,
        discount_total = %pricing.discount_total,
        total = %pricing.total,
        "Pricing calculated"
    );

    let provider = provider_by_region(&user.region);

    let (subscription_id, payment_id) =
        match insert_pending(pool, req, &user, provider, &pricing, idempotency_key).await {
            Ok(ids) => ids,
            Err(SubscriptionError::Database(e)) if payment_repo::is_idempotency_key_conflict(&e) => {
                // A concurrent duplicate won the insert race. Abandon this
                // attempt and replay the winning row.
                tracing::warn!(
                    idempotency_key,
                    "Idempotency unique constraint hit (race-safe replay)"
                );
                let existing = payment_repo::find_by_idempotency_key(pool, idempotency_key)
                    .await?
                    .ok_or_else(|| {
                        SubscriptionError::RecoveryInconsistency(idempotency_key.to_string())
                    })?;
                return replay(pool, gateways, existing).await;
            }
            Err(e) => return Err(e),
        };

    // Provider initiation happens outside the transaction; a failure here
    // leaves the payment row ref-less, to be completed by recovery on the
    // next attempt with the same key.
    let gateway = gateways.for_region(&user.region);
    let init = gateway
        .init_payment(pricing.total, SETTLEMENT_CURRENCY)
        .await?;

    payment_repo::set_provider_ref(pool, payment_id, &init.provider_ref).await?;

    let checkout_url = init
        .checkout_url
        .unwrap_or_else(|| checkout_url_from_provider_ref(provider, &init.provider_ref));

    tracing::info!(
        subscription_id = %subscription_id,
        payment_id = %payment_id,
        provider = ?provider,
        amount = %pricing.total,
        idempotency_key,
        "Subscription and payment created"
    );

    Ok(CreateSubscriptionResponse {
        subscription_id,
        status: SubscriptionStatus::Pending,
        provider,
        price: pricing,
        payment: PaymentSummary {
            payment_id,
            status: PaymentStatus::Created,
            provider_ref: init.provider_ref,
            checkout_url,
            idempotency_key: idempotency_key.to_string(),
        },
        idempotent_replay: false,
    })
}

/// Insert the subscription and payment pair in one atomic transaction.
/// Storage operations only; no network calls while the transaction is open.
async fn insert_pending(
    pool: &PgPool,
    req: &CreateSubscriptionRequest,
    user: &User,
    provider: PaymentProvider,
    pricing: &PricingResult,
    idempotency_key: &str,
) -> Result<(Uuid, Uuid), SubscriptionError> {
    let mut tx = pool.begin().await?;

    let subscription = subscription_repo::insert(
        &mut tx,
        &NewSubscription {
            id: Uuid::new_v4(),
            user_id: user.id,
            plan_id: pricing.plan_id,
            promo_code_id: pricing.promo_code_id,
            billing_period: req.billing_period,
            seats: req.seats,
            provider,
            price_subtotal: pricing.subtotal,
            discount_total: pricing.discount_total,
            price_total: pricing.total,
        },
    )
    .await?;

    let payment = payment_repo::insert(
        &mut tx,
        &NewPayment {
            id: Uuid::new_v4(),
            subscription_id: subscription.id,
            provider,
            amount: pricing.total,
            currency: SETTLEMENT_CURRENCY.to_string(),
            idempotency_key: idempotency_key.to_string(),
        },
    )
    .await?;

    tx.commit().await?;

    Ok((subscription.id, payment.id))
}

/// Build a replayed response from the payment recorded for this key.
///
/// Pricing is recomputed from the current catalog state of the stored
/// plan/promo/seats/billing period rather than read back as a snapshot; at
/// creation time the persisted subscription fields equal these values.
async fn replay(
    pool: &PgPool,
    gateways: &dyn GatewayFactory,
    existing: PaymentWithSubscription,
) -> Result<CreateSubscriptionResponse, SubscriptionError> {
    let existing = if existing.provider_ref.is_some() {
        existing
    } else {
        recover(pool, gateways, existing).await?
    };

    let provider_ref = existing
        .provider_ref
        .clone()
        .ok_or_else(|| SubscriptionError::RecoveryInconsistency(existing.idempotency_key.clone()))?;

    let pricing = pricing::calculate(
        pool,
        &PricingInput {
            plan_code: existing.plan_code.clone(),
            billing_period: existing.billing_period,
            seats: existing.seats,
            promo_code: existing.promo_code.clone(),
        },
    )
    .await?;

    tracing::warn!(
        idempotency_key = %existing.idempotency_key,
        subscription_id = %existing.subscription_id,
        payment_id = %existing.payment_id,
        provider = ?existing.provider,
        "Idempotent replay detected"
    );

    let checkout_url = checkout_url_from_provider_ref(existing.provider, &provider_ref);

    Ok(CreateSubscriptionResponse {
        subscription_id: existing.subscription_id,
        status: existing.subscription_status,
        provider: existing.provider,
        price: pricing,
        payment: PaymentSummary {
            payment_id: existing.payment_id,
            status: existing.payment_status,
            provider_ref,
            checkout_url,
            idempotency_key: existing.idempotency_key,
        },
        idempotent_replay: true,
    })
}

/// Complete the provider initiation a crashed attempt left behind: the
/// payment row committed but the gateway call (or the provider_ref update)
/// never happened. Calls the gateway for the stored amount, attaches the
/// reference, and re-reads the row.
async fn recover(
    pool: &PgPool,
    gateways: &dyn GatewayFactory,
    existing: PaymentWithSubscription,
) -> Result<PaymentWithSubscription, SubscriptionError> {
    tracing::warn!(
        payment_id = %existing.payment_id,
        idempotency_key = %existing.idempotency_key,
        "Payment has no provider reference, recovering"
    );

    let gateway = gateways.for_region(&existing.user_region);
    let init = gateway
        .init_payment(existing.amount, &existing.currency)
        .await?;

    payment_repo::set_provider_ref(pool, existing.payment_id, &init.provider_ref).await?;

    let refreshed = payment_repo::find_by_idempotency_key(pool, &existing.idempotency_key)
        .await?
        .ok_or_else(|| {
            SubscriptionError::RecoveryInconsistency(existing.idempotency_key.clone())
        })?;

    if refreshed.provider_ref.is_none() {
        return Err(SubscriptionError::RecoveryInconsistency(
            existing.idempotency_key.clone(),
        ));
    }

    tracing::info!(
        payment_id = %refreshed.payment_id,
        "Provider reference recovered"
    );

    Ok(refreshed)
}
