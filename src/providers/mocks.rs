//! Sandbox payment gateways for development and testing
//!
//! In production these would be replaced with actual provider integrations.
//! Each mock returns a fresh provider reference and a hosted checkout URL,
//! after a short simulated processing delay.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{PaymentGateway, PaymentInit, ProviderError};

async fn simulate_latency() {
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
}

pub struct StripeMockGateway;

#[async_trait]
impl PaymentGateway for StripeMockGateway {
    async fn init_payment(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentInit, ProviderError> {
        simulate_latency().await;

        let provider_ref = format!("stripe_{}", Uuid::new_v4().simple());
        tracing::info!(
            provider_ref = %provider_ref,
            %amount,
            currency,
            "Stripe mock payment initiated"
        );

        Ok(PaymentInit {
            checkout_url: Some(format!("https://mock.stripe/checkout/{}", provider_ref)),
            provider_ref,
        })
    }
}

pub struct MonobankMockGateway;

#[async_trait]
impl PaymentGateway for MonobankMockGateway {
    async fn init_payment(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentInit, ProviderError> {
        simulate_latency().await;

        let provider_ref = format!("mono_{}", Uuid::new_v4().simple());
        tracing::info!(
            provider_ref = %provider_ref,
            %amount,
            currency,
            "Monobank mock payment initiated"
        );

        Ok(PaymentInit {
            checkout_url: Some(format!("https://mock.monobank/checkout/{}", provider_ref)),
            provider_ref,
        })
    }
}

pub struct PixMockGateway;

#[async_trait]
impl PaymentGateway for PixMockGateway {
    async fn init_payment(
        &self,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentInit, ProviderError> {
        simulate_latency().await;

        let provider_ref = format!("pix_{}", Uuid::new_v4().simple());
        tracing::info!(
            provider_ref = %provider_ref,
            %amount,
            currency,
            "Pix mock payment initiated"
        );

        Ok(PaymentInit {
            checkout_url: Some(format!("https://mock.pix/checkout/{}", provider_ref)),
            provider_ref,
        })
    }
}
