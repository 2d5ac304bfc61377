use super::common::{parse_id, success_response};
use crate::{
    auth::AuthUser, errors::ServiceError, handlers::AppState, services::cart::CartNotice,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::post,
    Router,
};

// Cart mutations always answer 200. The notice's `outcome` tells the
// client whether anything changed.

#[utoipa::path(
    post,
    path = "/api/v1/cart/add/{item_id}",
    params(("item_id" = String, Path, description = "Item to add")),
    responses(
        (status = 200, description = "Cart notice", body = CartNotice),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> Result<Response, ServiceError> {
    let item_id = parse_id(&item_id, "Item")?;
    let notice = state.services.cart.add_to_cart(user.user_id, item_id).await?;
    Ok(success_response(notice))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/remove/{item_id}",
    params(("item_id" = String, Path, description = "Item to remove")),
    responses(
        (status = 200, description = "Cart notice", body = CartNotice),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> Result<Response, ServiceError> {
    let item_id = parse_id(&item_id, "Item")?;
    let notice = state
        .services
        .cart
        .remove_from_cart(user.user_id, item_id)
        .await?;
    Ok(success_response(notice))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/decrement/{item_id}",
    params(("item_id" = String, Path, description = "Item whose quantity drops by one")),
    responses(
        (status = 200, description = "Cart notice", body = CartNotice),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn decrement_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> Result<Response, ServiceError> {
    let item_id = parse_id(&item_id, "Item")?;
    let notice = state
        .services
        .cart
        .decrement_item(user.user_id, item_id)
        .await?;
    Ok(success_response(notice))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/add/:item_id", post(add_to_cart))
        .route("/cart/remove/:item_id", post(remove_from_cart))
        .route("/cart/decrement/:item_id", post(decrement_item))
}
