pub mod accounts;
pub mod articles;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod payments;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    notifications::Mailer,
    payments::PaymentGateways,
    services::{
        accounts::AccountService, articles::ArticleService, cart::CartService,
        catalog::CatalogService, checkout::CheckoutService, orders::OrderService,
        payments::PaymentService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub payments: Arc<PaymentService>,
    pub orders: Arc<OrderService>,
    pub articles: Arc<ArticleService>,
    pub accounts: Arc<AccountService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        gateways: PaymentGateways,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let events = Some(event_sender);

        Self {
            catalog: Arc::new(CatalogService::new(db_pool.clone(), events.clone())),
            cart: Arc::new(CartService::new(db_pool.clone(), events.clone())),
            checkout: Arc::new(CheckoutService::new(db_pool.clone(), events.clone())),
            payments: Arc::new(PaymentService::new(
                db_pool.clone(),
                gateways,
                config.payment_currency.clone(),
                config.rave_public_key.clone(),
                events.clone(),
            )),
            orders: Arc::new(OrderService::new(db_pool.clone(), events.clone())),
            articles: Arc::new(ArticleService::new(db_pool.clone(), events)),
            accounts: Arc::new(AccountService::new(
                db_pool,
                auth_service,
                mailer,
                config.password_reset_ttl_secs,
                config.public_base_url.clone(),
            )),
        }
    }
}
