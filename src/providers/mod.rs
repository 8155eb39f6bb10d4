//! Payment provider gateway abstraction.
//!
//! Provider selection is a fixed region mapping; the gateway itself is a
//! trait so the orchestrator can be exercised against failing or scripted
//! implementations. The orchestrator treats `init_payment` as at-least-once
//! and unreliable: it may time out or fail, and no transactional resources
//! are ever held across the call.

pub mod mocks;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::PaymentProvider;
use mocks::{MonobankMockGateway, PixMockGateway, StripeMockGateway};

/// Errors returned by payment gateways
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Payment initiation failed: {0}")]
    InitiationFailed(String),
}

/// Result of a successful payment initiation
#[derive(Debug, Clone)]
pub struct PaymentInit {
    pub provider_ref: String,
    /// Some gateways return a hosted checkout URL; when absent the caller
    /// derives one from the per-provider template.
    pub checkout_url: Option<String>,
}

/// Region-specific payment initiation
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn init_payment(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentInit, ProviderError>;
}

/// Stateless gateway selection, injected into the orchestrator
pub trait GatewayFactory: Send + Sync {
    fn for_region(&self, region: &str) -> Box<dyn PaymentGateway>;
}

/// Fixed region -> provider mapping: UA -> Monobank, BR -> Pix, else Stripe.
pub fn provider_by_region(region: &str) -> PaymentProvider {
    match region {
        "UA" => PaymentProvider::Monobank,
        "BR" => PaymentProvider::Pix,
        _ => PaymentProvider::Stripe,
    }
}

/// Derive a checkout URL from the fixed per-provider template.
pub fn checkout_url_from_provider_ref(provider: PaymentProvider, provider_ref: &str) -> String {
    match provider {
        PaymentProvider::Monobank => format!("https://mock.monobank/checkout/{}", provider_ref),
        PaymentProvider::Pix => format!("https://mock.pix/checkout/{}", provider_ref),
        PaymentProvider::Stripe => format!("https://mock.stripe/checkout/{}", provider_ref),
    }
}

/// Default factory returning the sandbox gateways
pub struct MockGatewayFactory;

impl GatewayFactory for MockGatewayFactory {
    fn for_region(&self, region: &str) -> Box<dyn PaymentGateway> {
        match provider_by_region(region) {
            PaymentProvider::Monobank => Box::new(MonobankMockGateway),
            PaymentProvider::Pix => Box::new(PixMockGateway),
            PaymentProvider::Stripe => Box::new(StripeMockGateway),
        }
    }
}
