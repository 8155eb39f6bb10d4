pub mod pricing;
pub mod subscriptions;

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::providers::GatewayFactory;

/// Shared handler state: the database pool and the gateway factory.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateways: Arc<dyn GatewayFactory>,
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(subscriptions::router(state.clone()))
        .merge(pricing::router(state))
}
