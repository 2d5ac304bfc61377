use crate::{
    db::DbPool,
    entities::{checkout_address, order},
    errors::ServiceError,
    events::{Event, EventSender},
    services::open_order::{open_order_summary, require_open_order, OrderSummary},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const INVALID_PAYMENT_OPTION: &str = "Invalid Payment option";

/// How the shopper chose to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card charged synchronously through Stripe
    Stripe,
    /// Redirect flow confirmed by Paystack `reference`
    Paystack,
    /// Redirect flow confirmed by Flutterwave `tx_ref`
    Flutterwave,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stripe => "S",
            Self::Paystack => "P",
            Self::Flutterwave => "F",
        }
    }

    /// Path segment of the payment page for this method
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paystack => "paypal",
            Self::Flutterwave => "flutterwave",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "stripe" => Some(Self::Stripe),
            "paypal" | "paystack" => Some(Self::Paystack),
            "flutterwave" => Some(Self::Flutterwave),
            _ => None,
        }
    }

    pub fn payment_path(&self) -> String {
        format!("/api/v1/payment/{}", self.slug())
    }
}

impl FromStr for PaymentMethod {
    type Err = ServiceError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim() {
            "S" => Ok(Self::Stripe),
            "P" => Ok(Self::Paystack),
            "F" => Ok(Self::Flutterwave),
            _ => Err(ServiceError::InvalidInput(INVALID_PAYMENT_OPTION.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn default_country() -> String {
    "NG".to_string()
}

fn default_payment_option() -> String {
    "F".to_string()
}

/// Shipping address and payment choice
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutForm {
    #[validate(length(min = 1, max = 100, message = "Street address is required"))]
    pub street_address: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub apartment_address: Option<String>,
    #[serde(default = "default_country")]
    #[validate(length(equal = 2, message = "Country must be a two-letter code"))]
    pub country: String,
    #[validate(length(min = 1, max = 100, message = "Zip is required"))]
    pub zip: String,
    #[validate(length(min = 1, max = 11, message = "Phone must be at most 11 characters"))]
    pub phone: String,
    #[serde(default = "default_payment_option")]
    pub payment_option: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub checkout_address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub next: String,
}

/// Amount due for the open order on a payment page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentStart {
    pub order_id: Uuid,
    pub payment_method: PaymentMethod,
    pub total: rust_decimal::Decimal,
    pub currency: String,
    /// Publishable key for client-side provider widgets, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CheckoutService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Open order with its lines as the checkout page shows it
    #[instrument(skip(self))]
    pub async fn checkout_page(&self, user_id: Uuid) -> Result<OrderSummary, ServiceError> {
        open_order_summary(&*self.db_pool, user_id).await
    }

    /// Stores the shipping address on the open order and picks the payment route
    #[instrument(skip(self, form))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        form: CheckoutForm,
    ) -> Result<CheckoutResponse, ServiceError> {
        form.validate()?;
        let method: PaymentMethod = form.payment_option.parse().map_err(|e| {
            warn!(option = %form.payment_option, "rejected payment option");
            e
        })?;

        let txn = self.db_pool.begin().await?;
        let order = require_open_order(&txn, user_id).await?;

        let address = checkout_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street_address: Set(form.street_address),
            apartment_address: Set(form.apartment_address.unwrap_or_default()),
            country: Set(form.country.to_uppercase()),
            zip: Set(form.zip),
            phone: Set(form.phone),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let order_id = order.id;
        let mut active: order::ActiveModel = order.into_active_model();
        active.checkout_address_id = Set(Some(address.id));
        active.update(&txn).await?;
        txn.commit().await?;

        info!(%order_id, address_id = %address.id, %method, "checkout captured");
        if let Some(sender) = &self.event_sender {
            sender
                .publish(Event::CheckoutCompleted {
                    order_id,
                    checkout_address_id: address.id,
                })
                .await;
        }

        Ok(CheckoutResponse {
            order_id,
            checkout_address_id: address.id,
            payment_method: method,
            next: method.payment_path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("S", PaymentMethod::Stripe, "/api/v1/payment/stripe")]
    #[case("P", PaymentMethod::Paystack, "/api/v1/payment/paypal")]
    #[case("F", PaymentMethod::Flutterwave, "/api/v1/payment/flutterwave")]
    fn payment_codes_route_to_pages(
        #[case] code: &str,
        #[case] method: PaymentMethod,
        #[case] path: &str,
    ) {
        let parsed: PaymentMethod = code.parse().unwrap();
        assert_eq!(parsed, method);
        assert_eq!(parsed.payment_path(), path);
        assert_eq!(PaymentMethod::from_slug(parsed.slug()), Some(parsed));
    }

    #[rstest]
    #[case("X")]
    #[case("")]
    #[case("stripe")]
    fn unknown_codes_are_rejected(#[case] code: &str) {
        assert_matches!(
            code.parse::<PaymentMethod>(),
            Err(ServiceError::InvalidInput(msg)) if msg == INVALID_PAYMENT_OPTION
        );
    }

    #[test]
    fn form_defaults_and_phone_limit() {
        let form: CheckoutForm = serde_json::from_value(serde_json::json!({
            "street_address": "12 Marina",
            "zip": "101001",
            "phone": "08012345678"
        }))
        .unwrap();
        assert_eq!(form.country, "NG");
        assert_eq!(form.payment_option, "F");
        assert!(form.validate().is_ok());

        let mut long_phone = form.clone();
        long_phone.phone = "080123456789".into();
        assert!(long_phone.validate().is_err());
    }
}
