use super::common::{created_response, parse_id, success_response, JsonBody};
use crate::{
    auth::AuthUser,
    entities::item,
    errors::ServiceError,
    handlers::AppState,
    services::catalog::{DealRequest, DealView, HomePage, ItemRequest, StockRequest, StockView},
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};

/// Landing page: every item plus the most recent deal
#[utoipa::path(
    get,
    path = "/api/v1/",
    responses(
        (status = 200, description = "Home page content", body = HomePage),
    ),
    tag = "Catalog"
)]
pub async fn home(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let page = state.services.catalog.home().await?;
    Ok(success_response(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses(
        (status = 200, description = "Catalog items, newest first", body = [item::Model]),
    ),
    tag = "Catalog"
)]
pub async fn list_items(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let items = state.services.catalog.list_items().await?;
    Ok(success_response(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item found", body = item::Model),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id = parse_id(&id, "Item")?;
    let item = state.services.catalog.get_item(id).await?;
    Ok(success_response(item))
}

/// Add a product. `total_stock` is derived from initial and top-up stock.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = ItemRequest,
    responses(
        (status = 201, description = "Item created", body = item::Model),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 403, description = "Staff only", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<ItemRequest>,
) -> Result<Response, ServiceError> {
    let item = state.services.catalog.create_item(&user, request).await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Item updated", body = item::Model),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<ItemRequest>,
) -> Result<Response, ServiceError> {
    let id = parse_id(&id, "Item")?;
    let item = state.services.catalog.update_item(&user, id, request).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/deals",
    responses((status = 200, description = "Deals, newest first", body = [DealView])),
    tag = "Catalog"
)]
pub async fn list_deals(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let deals = state.services.catalog.list_deals().await?;
    Ok(success_response(deals))
}

#[utoipa::path(
    post,
    path = "/api/v1/deals",
    request_body = DealRequest,
    responses(
        (status = 201, description = "Deal created", body = DealView),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_deal(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<DealRequest>,
) -> Result<Response, ServiceError> {
    let deal = state.services.catalog.create_deal(&user, request).await?;
    Ok(created_response(deal))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock",
    responses((status = 200, description = "Stock ledger", body = [StockView])),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let rows = state.services.catalog.list_stock(&user).await?;
    Ok(success_response(rows))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock",
    request_body = StockRequest,
    responses((status = 201, description = "Stock row recorded", body = StockView)),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_stock(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<StockRequest>,
) -> Result<Response, ServiceError> {
    let row = state.services.catalog.create_stock(&user, request).await?;
    Ok(created_response(row))
}

/// Routes anyone may call
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item))
        .route("/deals", get(list_deals))
}

/// Catalog management, mounted behind the staff role
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/items", axum::routing::post(create_item))
        .route("/items/:id", axum::routing::put(update_item))
        .route("/deals", axum::routing::post(create_deal))
        .route("/stock", get(list_stock).post(create_stock))
}
