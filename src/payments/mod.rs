//! Payment gateway clients.
//!
//! Card charges go through a [`CardGateway`]; redirect-based providers are
//! confirmed through a [`VerificationGateway`]. Both are traits so the
//! reconciliation service can be exercised against fakes.

pub mod flutterwave;
pub mod paystack;
pub mod stripe;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub use flutterwave::FlutterwaveGateway;
pub use paystack::PaystackGateway;
pub use stripe::StripeGateway;

/// Failure reported by a payment provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("card declined: {0}")]
    CardDeclined(String),
    #[error("rate limited by gateway")]
    RateLimited,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("gateway authentication failed")]
    Authentication,
    #[error("network error: {0}")]
    Connection(String),
    #[error("{0}")]
    Verification(String),
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("{0}")]
    Unexpected(String),
}

impl GatewayError {
    /// Message shown to the shopper after a failed card charge
    pub fn user_message(&self) -> String {
        match self {
            Self::CardDeclined(message) => message.clone(),
            Self::RateLimited => "To many request error".to_string(),
            Self::InvalidRequest(_) => "Invalid Parameter".to_string(),
            Self::Authentication => "Authentication with stripe failed".to_string(),
            Self::Connection(_) => "Network Error".to_string(),
            Self::Verification(_) | Self::Gateway(_) => "Something went wrong".to_string(),
            Self::Unexpected(_) => "Not identified error".to_string(),
        }
    }

    /// Message shown after a failed redirect verification: the provider's
    /// own message for verification errors, the error text otherwise
    pub fn verification_message(&self) -> String {
        match self {
            Self::Verification(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Unexpected(format!("unreadable gateway response: {}", err))
        } else {
            Self::Gateway(err.to_string())
        }
    }
}

/// Card charge request in the currency's minor unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub source: String,
}

/// Successful card charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub id: String,
    pub status: String,
    pub amount_minor: i64,
}

/// Transaction confirmed by a redirect-based provider, amounts in major units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransaction {
    pub transaction_id: String,
    pub status: String,
    pub reference: String,
    pub amount: Decimal,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn charge(&self, request: ChargeRequest) -> Result<Charge, GatewayError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Provider name used in logs
    fn provider(&self) -> &'static str;

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError>;
}

/// The set of gateways the storefront talks to
#[derive(Clone)]
pub struct PaymentGateways {
    pub card: Arc<dyn CardGateway>,
    pub paystack: Arc<dyn VerificationGateway>,
    pub flutterwave: Arc<dyn VerificationGateway>,
}

impl PaymentGateways {
    pub fn new(
        card: Arc<dyn CardGateway>,
        paystack: Arc<dyn VerificationGateway>,
        flutterwave: Arc<dyn VerificationGateway>,
    ) -> Self {
        Self {
            card,
            paystack,
            flutterwave,
        }
    }

    /// Builds the HTTP-backed gateways from configuration
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let client = http_client(cfg.payment_http_timeout())?;

        Ok(Self {
            card: Arc::new(StripeGateway::new(
                client.clone(),
                cfg.stripe_api_base.clone(),
                cfg.stripe_secret_key.clone(),
            )),
            paystack: Arc::new(PaystackGateway::new(
                client.clone(),
                cfg.paystack_api_base.clone(),
                cfg.paystack_secret_key.clone(),
            )),
            flutterwave: Arc::new(FlutterwaveGateway::new(
                client,
                cfg.rave_api_base.clone(),
                cfg.rave_secret_key.clone(),
            )),
        })
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::InternalError(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GatewayError::CardDeclined("Your card was declined.".into()), "Your card was declined.")]
    #[case(GatewayError::RateLimited, "To many request error")]
    #[case(GatewayError::InvalidRequest("bad source".into()), "Invalid Parameter")]
    #[case(GatewayError::Authentication, "Authentication with stripe failed")]
    #[case(GatewayError::Connection("reset".into()), "Network Error")]
    #[case(GatewayError::Gateway("500".into()), "Something went wrong")]
    #[case(GatewayError::Unexpected("boom".into()), "Not identified error")]
    fn card_failures_map_to_shopper_messages(#[case] err: GatewayError, #[case] expected: &str) {
        assert_eq!(err.user_message(), expected);
    }

    #[test]
    fn verification_errors_surface_provider_message() {
        let err = GatewayError::Verification("Transaction not found".into());
        assert_eq!(err.verification_message(), "Transaction not found");

        let err = GatewayError::Connection("timed out".into());
        assert_eq!(err.verification_message(), "network error: timed out");
    }
}
