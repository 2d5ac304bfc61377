use super::common::{success_response, JsonBody};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        open_order::OrderSummary,
        orders::{LatestOrder, OrderView, UpdateOrderStatusRequest},
    },
};
use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders visible to the caller, newest first", body = [OrderView]),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let orders = state.services.orders.list_orders(&user).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/order-summary",
    responses(
        (status = 200, description = "Open order with totals", body = OrderSummary),
        (status = 404, description = "No open order", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn order_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let summary = state.services.orders.order_summary(user.user_id).await?;
    Ok(success_response(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/latest",
    responses((status = 200, description = "Ten most recent orders", body = [LatestOrder])),
    tag = "Orders"
)]
pub async fn latest_orders(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let snapshot = state.services.orders.latest_orders().await?;
    Ok(success_response(snapshot))
}

/// Overwrite an order's delivery status (`1` New, `2` Processing, `3` Shipped, `4` Delivered)
#[utoipa::path(
    post,
    path = "/api/v1/orders/status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderView),
        (status = 400, description = "Unknown status code", body = crate::errors::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<UpdateOrderStatusRequest>,
) -> Result<Response, ServiceError> {
    let order = state.services.orders.update_status(&user, request).await?;
    Ok(success_response(order))
}

/// Server-sent events carrying the latest-orders snapshot. The current
/// snapshot is sent on connect, then one event per change.
#[utoipa::path(
    get,
    path = "/api/v1/orders/feed",
    responses((status = 200, description = "text/event-stream of latest-orders snapshots")),
    tag = "Orders"
)]
pub async fn order_feed(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ServiceError> {
    // Subscribe before reading so no change between the two is lost
    let rx = state.order_feed.subscribe();
    let topic = state.order_feed.topic();
    let initial = serde_json::to_value(state.services.orders.latest_orders().await?)
        .map_err(|e| ServiceError::InternalError(e.to_string()))?;

    let first = stream::once(async move { Ok(snapshot_event(topic, &initial)) });
    let updates = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => return Some((Ok(snapshot_event(topic, &snapshot)), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic, skipped, "feed subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!(topic, "feed closed");
                    return None;
                }
            }
        }
    });

    Ok(Sse::new(futures::StreamExt::chain(first, updates)).keep_alive(KeepAlive::default()))
}

fn snapshot_event(topic: &str, snapshot: &serde_json::Value) -> SseEvent {
    SseEvent::default().event(topic).data(snapshot.to_string())
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/latest", get(latest_orders))
        .route("/orders/feed", get(order_feed))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/order-summary", get(order_summary))
}

pub fn staff_routes() -> Router<AppState> {
    Router::new().route("/orders/status", post(update_status))
}
