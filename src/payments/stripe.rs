use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{CardGateway, Charge, ChargeRequest, GatewayError};

/// Stripe Charges API client
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    status: String,
    amount: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: StripeErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(client: reqwest::Client, api_base: String, secret_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn classify(status: StatusCode, body: ErrorEnvelope) -> GatewayError {
        let message = body
            .error
            .message
            .unwrap_or_else(|| format!("Stripe returned {}", status));

        match (status, body.error.kind.as_str()) {
            (_, "card_error") | (StatusCode::PAYMENT_REQUIRED, _) => {
                GatewayError::CardDeclined(message)
            }
            (StatusCode::TOO_MANY_REQUESTS, _) | (_, "rate_limit_error") => {
                GatewayError::RateLimited
            }
            (StatusCode::UNAUTHORIZED, _) | (_, "authentication_error") => {
                GatewayError::Authentication
            }
            (_, "invalid_request_error") | (StatusCode::BAD_REQUEST, _) | (StatusCode::NOT_FOUND, _) => {
                GatewayError::InvalidRequest(message)
            }
            _ => GatewayError::Gateway(message),
        }
    }
}

#[async_trait]
impl CardGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount = request.amount_minor, currency = %request.currency))]
    async fn charge(&self, request: ChargeRequest) -> Result<Charge, GatewayError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or(GatewayError::Authentication)?;

        let amount = request.amount_minor.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("source", request.source.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/charges", self.api_base))
            .basic_auth(secret, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorEnvelope = response.json().await.unwrap_or_default();
            let err = Self::classify(status, body);
            warn!(%status, error = %err, "Stripe charge rejected");
            return Err(err);
        }

        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unexpected(format!("Failed to parse Stripe response: {}", e)))?;

        info!(charge_id = %charge.id, "Stripe charge created");
        Ok(Charge {
            id: charge.id,
            status: charge.status,
            amount_minor: charge.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> StripeGateway {
        StripeGateway::new(
            reqwest::Client::new(),
            server.uri(),
            Some("sk_test_123".into()),
        )
    }

    fn request() -> ChargeRequest {
        ChargeRequest {
            amount_minor: 2100,
            currency: "usd".into(),
            source: "tok_visa".into(),
        }
    }

    #[tokio::test]
    async fn successful_charge_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .and(header_exists("authorization"))
            .and(body_string_contains("amount=2100"))
            .and(body_string_contains("source=tok_visa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "ch_1",
                "status": "succeeded",
                "amount": 2100
            })))
            .expect(1)
            .mount(&server)
            .await;

        let charge = gateway(&server).charge(request()).await.unwrap();
        assert_eq!(charge.id, "ch_1");
        assert_eq!(charge.status, "succeeded");
        assert_eq!(charge.amount_minor, 2100);
    }

    #[tokio::test]
    async fn card_error_carries_gateway_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {"type": "card_error", "message": "Your card was declined."}
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).charge(request()).await.unwrap_err();
        assert_eq!(err, GatewayError::CardDeclined("Your card was declined.".into()));
    }

    #[tokio::test]
    async fn rate_limit_and_auth_failures_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        assert_eq!(
            gateway(&server).charge(request()).await.unwrap_err(),
            GatewayError::RateLimited
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"type": "authentication_error", "message": "Invalid API Key"}
            })))
            .mount(&server)
            .await;
        assert_eq!(
            gateway(&server).charge(request()).await.unwrap_err(),
            GatewayError::Authentication
        );
    }

    #[tokio::test]
    async fn missing_secret_key_fails_without_calling_out() {
        let gateway = StripeGateway::new(reqwest::Client::new(), "http://127.0.0.1:9".into(), None);
        assert_eq!(
            gateway.charge(request()).await.unwrap_err(),
            GatewayError::Authentication
        );
    }
}
