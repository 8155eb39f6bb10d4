//! Subscription API routes
//!
//! POST /api/subscriptions        - create (Idempotency-Key header required)
//! GET  /api/subscriptions        - list for the requesting owner
//! GET  /api/subscriptions/{id}   - detail, ownership-scoped

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{CreateSubscriptionRequest, ErrorResponse};
use crate::pricing::PricingError;
use crate::services::query_service::{self, SubscriptionDetails};
use crate::services::subscription_service::{self, CreateSubscriptionResponse, SubscriptionError};

use super::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/subscriptions",
            post(create_subscription).get(list_subscriptions),
        )
        .route("/api/subscriptions/{id}", get(get_subscription))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct OwnerQuery {
    user_id: Uuid,
}

async fn create_subscription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<CreateSubscriptionResponse>), (StatusCode, Json<ErrorResponse>)> {
    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let response =
        subscription_service::create(&state.pool, state.gateways.as_ref(), &req, idempotency_key)
            .await
            .map_err(error_response)?;

    let status = if response.idempotent_replay {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(response)))
}

async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<SubscriptionDetails>>, (StatusCode, Json<ErrorResponse>)> {
    let subscriptions = query_service::find_all(&state.pool, params.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(subscriptions))
}

async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<SubscriptionDetails>, (StatusCode, Json<ErrorResponse>)> {
    let subscription = query_service::find_by_id(&state.pool, id, params.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(subscription))
}

/// Map service errors to HTTP outcomes. Input and business-rule errors are
/// 4xx; gateway initiation failures are 502 so callers retry with the same
/// key; everything else is a 500.
pub fn error_response(err: SubscriptionError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = classify(&err);
    (status, Json(ErrorResponse::new(code, err.to_string())))
}

fn classify(err: &SubscriptionError) -> (StatusCode, &'static str) {
    match err {
        SubscriptionError::MissingIdempotencyKey => {
            (StatusCode::BAD_REQUEST, "missing_idempotency_key")
        }
        SubscriptionError::Pricing(PricingError::PlanNotFound(_)) => {
            (StatusCode::BAD_REQUEST, "unknown_plan")
        }
        SubscriptionError::Pricing(PricingError::PromoNotFound(_)) => {
            (StatusCode::BAD_REQUEST, "unknown_promo_code")
        }
        SubscriptionError::Pricing(PricingError::PromoInactiveOrExpired(_)) => {
            (StatusCode::BAD_REQUEST, "invalid_promo_code")
        }
        SubscriptionError::Pricing(PricingError::Database(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
        }
        SubscriptionError::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
        SubscriptionError::ProviderInitiationFailed(_) => {
            (StatusCode::BAD_GATEWAY, "provider_initiation_failed")
        }
        SubscriptionError::RecoveryInconsistency(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "recovery_inconsistency")
        }
        SubscriptionError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        SubscriptionError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;

    #[test]
    fn input_errors_map_to_400() {
        assert_eq!(
            classify(&SubscriptionError::MissingIdempotencyKey).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            classify(&SubscriptionError::Pricing(PricingError::PlanNotFound(
                "NOPE".into()
            )))
            .0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            classify(&SubscriptionError::Pricing(
                PricingError::PromoInactiveOrExpired("OLD".into())
            ))
            .0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn resource_errors_map_to_404() {
        assert_eq!(
            classify(&SubscriptionError::UserNotFound(uuid::Uuid::new_v4())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            classify(&SubscriptionError::NotFound).0,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn transient_and_fatal_errors() {
        assert_eq!(
            classify(&SubscriptionError::ProviderInitiationFailed(
                ProviderError::InitiationFailed("timeout".into())
            ))
            .0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            classify(&SubscriptionError::RecoveryInconsistency("key".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
