use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{GatewayError, VerificationGateway, VerifiedTransaction};

/// Paystack transaction verification client
#[derive(Clone)]
pub struct PaystackGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    id: i64,
    #[serde(default)]
    reference: String,
    /// Kobo
    #[serde(default)]
    amount: i64,
}

impl PaystackGateway {
    pub fn new(client: reqwest::Client, api_base: String, secret_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }
}

#[async_trait]
impl VerificationGateway for PaystackGateway {
    fn provider(&self) -> &'static str {
        "paystack"
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or(GatewayError::Authentication)?;

        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.api_base, reference))
            .bearer_auth(secret)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Authentication);
        }

        let body: VerifyResponse = response.json().await.map_err(|e| {
            GatewayError::Unexpected(format!("Failed to parse Paystack response: {}", e))
        })?;

        if !status.is_success() || !body.status {
            warn!(%status, message = %body.message, "Paystack verification rejected");
            return Err(GatewayError::Verification(body.message));
        }

        let data = body.data.ok_or_else(|| {
            GatewayError::Unexpected("Paystack response missing transaction data".into())
        })?;

        info!(transaction_id = data.id, "Paystack transaction verified");
        Ok(VerifiedTransaction {
            transaction_id: data.id.to_string(),
            status: body.message,
            reference: data.reference,
            amount: Decimal::new(data.amount, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> PaystackGateway {
        PaystackGateway::new(reqwest::Client::new(), server.uri(), Some("sk_test_ps".into()))
    }

    #[tokio::test]
    async fn verified_transaction_converts_kobo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/ref-42"))
            .and(header("authorization", "Bearer sk_test_ps"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Verification successful",
                "data": {"id": 9001, "reference": "ref-42", "amount": 250050}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tx = gateway(&server).verify("ref-42").await.unwrap();
        assert_eq!(tx.transaction_id, "9001");
        assert_eq!(tx.status, "Verification successful");
        assert_eq!(tx.reference, "ref-42");
        assert_eq!(tx.amount, dec!(2500.50));
    }

    #[tokio::test]
    async fn rejected_reference_returns_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/verify/missing"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "status": false,
                "message": "Transaction reference not found"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).verify("missing").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Verification("Transaction reference not found".into())
        );
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = gateway(&server).verify("ref").await.unwrap_err();
        assert_eq!(err, GatewayError::Authentication);
    }
}
