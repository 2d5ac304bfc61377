use super::common::{success_response, JsonBody};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        checkout::{CheckoutForm, CheckoutResponse},
        open_order::OrderSummary,
    },
};
use axum::{extract::State, response::Response, routing::get, Router};

#[utoipa::path(
    get,
    path = "/api/v1/checkout",
    responses(
        (status = 200, description = "Open order to be checked out", body = OrderSummary),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout_page(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let summary = state.services.checkout.checkout_page(user.user_id).await?;
    Ok(success_response(summary))
}

/// Capture the shipping address and choose how to pay
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutForm,
    responses(
        (status = 200, description = "Address stored, payment path returned", body = CheckoutResponse),
        (status = 400, description = "Invalid form or payment option", body = crate::errors::ErrorResponse),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(form): JsonBody<CheckoutForm>,
) -> Result<Response, ServiceError> {
    let response = state.services.checkout.checkout(user.user_id, form).await?;
    Ok(success_response(response))
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", get(checkout_page).post(checkout))
}
