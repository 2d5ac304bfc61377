use super::common::{success_response, JsonBody};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        checkout::{PaymentMethod, PaymentStart, INVALID_PAYMENT_OPTION},
        payments::{
            CardChargeForm, CompletePaymentQuery, PaymentOutcome, VerificationReport,
            VerifyPaymentQuery,
        },
    },
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};

/// Amount due on the open order for the chosen provider
#[utoipa::path(
    get,
    path = "/api/v1/payment/{option}",
    params(("option" = String, Path, description = "stripe, paypal or flutterwave")),
    responses(
        (status = 200, description = "Payment start details", body = PaymentStart),
        (status = 400, description = "Unknown option", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_start(
    State(state): State<AppState>,
    user: AuthUser,
    Path(option): Path<String>,
) -> Result<Response, ServiceError> {
    let method = PaymentMethod::from_slug(&option)
        .ok_or_else(|| ServiceError::InvalidInput(INVALID_PAYMENT_OPTION.to_string()))?;
    let start = state
        .services
        .payments
        .payment_start(user.user_id, method)
        .await?;
    Ok(success_response(start))
}

// `/payment/stripe` is a static route, so its GET has to be registered
// next to the POST.
async fn stripe_start(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let start = state
        .services
        .payments
        .payment_start(user.user_id, PaymentMethod::Stripe)
        .await?;
    Ok(success_response(start))
}

/// Charge the open order to a card token and finalize it
#[utoipa::path(
    post,
    path = "/api/v1/payment/stripe",
    request_body = CardChargeForm,
    responses(
        (status = 200, description = "Order paid", body = PaymentOutcome),
        (status = 402, description = "Charge failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn charge_card(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(form): JsonBody<CardChargeForm>,
) -> Result<Response, ServiceError> {
    let outcome = state.services.payments.charge_card(user.user_id, form).await?;
    Ok(success_response(outcome))
}

/// Provider redirect target. `reference` selects Paystack, `tx_ref` Flutterwave.
#[utoipa::path(
    get,
    path = "/api/v1/payments/complete",
    params(CompletePaymentQuery),
    responses(
        (status = 200, description = "Payment verified and order finalized", body = PaymentOutcome),
        (status = 402, description = "Verification failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn complete_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CompletePaymentQuery>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .services
        .payments
        .complete_payment(user.user_id, query)
        .await?;
    Ok(success_response(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/verify",
    params(VerifyPaymentQuery),
    responses(
        (status = 200, description = "Verification report", body = VerificationReport),
        (status = 400, description = "Missing tx_ref", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyPaymentQuery>,
) -> Result<Response, ServiceError> {
    let report = state.services.payments.verify_only(query).await?;
    Ok(success_response(report))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payment/stripe", get(stripe_start).post(charge_card))
        .route("/payment/:option", get(payment_start))
        .route("/payments/complete", get(complete_payment))
        .route("/payments/verify", get(verify_payment))
}
