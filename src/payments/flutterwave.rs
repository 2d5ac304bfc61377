use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{GatewayError, VerificationGateway, VerifiedTransaction};

/// Flutterwave (Rave) transaction verification client
#[derive(Clone)]
pub struct FlutterwaveGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    txref: &'a str,
    #[serde(rename = "SECKEY")]
    seckey: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    txref: String,
    #[serde(default)]
    flwref: String,
    #[serde(default)]
    chargecode: String,
    #[serde(default)]
    amount: Decimal,
}

const VERIFY_PATH: &str = "/flwv3-pug/getpaidx/api/v2/verify";

impl FlutterwaveGateway {
    pub fn new(client: reqwest::Client, api_base: String, secret_key: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }
}

#[async_trait]
impl VerificationGateway for FlutterwaveGateway {
    fn provider(&self) -> &'static str {
        "flutterwave"
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or(GatewayError::Authentication)?;

        let response = self
            .client
            .post(format!("{}{}", self.api_base, VERIFY_PATH))
            .json(&VerifyRequest {
                txref: reference,
                seckey: secret,
            })
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let http_status = response.status();
        let body: VerifyResponse = response.json().await.map_err(|e| {
            GatewayError::Unexpected(format!("Failed to parse Flutterwave response: {}", e))
        })?;

        if body.status != "success" {
            warn!(%http_status, message = %body.message, "Flutterwave verification rejected");
            return Err(GatewayError::Verification(body.message));
        }

        let data = body.data.ok_or_else(|| {
            GatewayError::Unexpected("Flutterwave response missing transaction data".into())
        })?;

        let status = match data.chargecode.as_str() {
            "00" | "0" => "Verified",
            _ => "Verification Error",
        };

        info!(flwref = %data.flwref, %status, "Flutterwave transaction checked");
        Ok(VerifiedTransaction {
            transaction_id: data.flwref,
            status: status.to_string(),
            reference: data.txref,
            amount: data.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> FlutterwaveGateway {
        FlutterwaveGateway::new(
            reqwest::Client::new(),
            server.uri(),
            Some("FLWSECK-test".into()),
        )
    }

    #[tokio::test]
    async fn successful_charge_code_is_verified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .and(body_json(serde_json::json!({"txref": "tx-1", "SECKEY": "FLWSECK-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "Tx Fetched",
                "data": {"txref": "tx-1", "flwref": "FLW-MOCK-1", "chargecode": "00", "amount": 1500}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tx = gateway(&server).verify("tx-1").await.unwrap();
        assert_eq!(tx.status, "Verified");
        assert_eq!(tx.transaction_id, "FLW-MOCK-1");
        assert_eq!(tx.reference, "tx-1");
        assert_eq!(tx.amount, dec!(1500));
    }

    #[tokio::test]
    async fn unexpected_charge_code_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "message": "Tx Fetched",
                "data": {"txref": "tx-2", "flwref": "FLW-MOCK-2", "chargecode": "02", "amount": 10}
            })))
            .mount(&server)
            .await;

        let tx = gateway(&server).verify("tx-2").await.unwrap();
        assert_eq!(tx.status, "Verification Error");
    }

    #[tokio::test]
    async fn error_status_returns_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "message": "No transaction found"
            })))
            .mount(&server)
            .await;

        let err = gateway(&server).verify("tx-3").await.unwrap_err();
        assert_eq!(err, GatewayError::Verification("No transaction found".into()));
    }
}
