//! Pricing preview route
//!
//! POST /api/pricing/calculate - compute a price without creating anything.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::models::ErrorResponse;
use crate::pricing::{self, PricingError, PricingInput, PricingResult};

use super::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/pricing/calculate", post(calculate_price))
        .with_state(state)
}

async fn calculate_price(
    State(state): State<AppState>,
    Json(input): Json<PricingInput>,
) -> Result<Json<PricingResult>, (StatusCode, Json<ErrorResponse>)> {
    let result = pricing::calculate(&state.pool, &input)
        .await
        .map_err(error_response)?;

    Ok(Json(result))
}

fn error_response(err: PricingError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        PricingError::PlanNotFound(_) => (StatusCode::BAD_REQUEST, "unknown_plan"),
        PricingError::PromoNotFound(_) => (StatusCode::BAD_REQUEST, "unknown_promo_code"),
        PricingError::PromoInactiveOrExpired(_) => (StatusCode::BAD_REQUEST, "invalid_promo_code"),
        PricingError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    };

    (status, Json(ErrorResponse::new(code, err.to_string())))
}
