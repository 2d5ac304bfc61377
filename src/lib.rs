//! Storefront API library
//!
//! Catalog, cart, checkout, multi-gateway payment reconciliation, order
//! tracking with a live snapshot feed, and a news feed with comments.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod services;
pub mod tracing;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService, STAFF_ROLE};
use crate::events::Feed;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: crate::config::AppConfig,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
    /// Broadcast of latest-orders snapshots served as SSE
    pub order_feed: Feed,
}

/// Every `/api/v1` route, grouped by the access it requires
pub fn api_v1_routes(state: &AppState) -> Router<AppState> {
    let auth = state.auth.clone();

    let public = Router::new()
        .merge(handlers::catalog::public_routes())
        .merge(handlers::orders::public_routes())
        .merge(handlers::articles::public_routes())
        .merge(handlers::accounts::public_routes());

    let shopper = Router::new()
        .merge(handlers::cart::cart_routes())
        .merge(handlers::checkout::checkout_routes())
        .merge(handlers::payments::payment_routes())
        .merge(handlers::orders::user_routes())
        .merge(handlers::accounts::user_routes())
        .with_auth(auth.clone());

    let staff = Router::new()
        .merge(handlers::catalog::staff_routes())
        .merge(handlers::orders::staff_routes())
        .merge(handlers::articles::staff_routes())
        .with_role(auth, STAFF_ROLE);

    Router::new()
        .merge(health::health_routes(state.db.clone()))
        .merge(public)
        .merge(shopper)
        .merge(staff)
}

/// The application router with request-scoped layers. Transport layers
/// (CORS, compression, timeouts) are added by the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(&state))
        .merge(openapi::swagger_ui())
        .layer(axum::middleware::from_fn(
            logging::request_logging_middleware,
        ))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser};
    pub use crate::db::DbPool;
    pub use crate::errors::{ErrorResponse, ServiceError};
    pub use crate::events::{Event, EventSender, Feed};
    pub use crate::{app_router, AppState};
}
