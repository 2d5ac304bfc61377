use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Catalog, cart, checkout and payment reconciliation for a small produce
shop, plus order tracking and a news feed.

## Authentication

Shopper and staff endpoints take a JWT issued by `POST /api/v1/auth/login`:

```
Authorization: Bearer <token>
```

Staff-only endpoints answer 403 to shopper tokens.

## Errors

Failures share one body:

```json
{
  "error": "Not Found",
  "message": "You do not have an order",
  "request_id": "8d6c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Gateway failures answer 402 with a shopper-facing message.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "Catalog", description = "Items, deals and the stock ledger"),
        (name = "Cart", description = "Open order mutations"),
        (name = "Checkout", description = "Shipping address and payment choice"),
        (name = "Payments", description = "Card charges and redirect verification"),
        (name = "Orders", description = "Order listing, status and the live feed"),
        (name = "Articles", description = "News feed and comments"),
        (name = "Accounts", description = "Signup, login and password management"),
        (name = "Health", description = "Liveness and database ping")
    ),
    paths(
        crate::health::health_check,

        crate::handlers::catalog::home,
        crate::handlers::catalog::list_items,
        crate::handlers::catalog::get_item,
        crate::handlers::catalog::create_item,
        crate::handlers::catalog::update_item,
        crate::handlers::catalog::list_deals,
        crate::handlers::catalog::create_deal,
        crate::handlers::catalog::list_stock,
        crate::handlers::catalog::create_stock,

        crate::handlers::cart::add_to_cart,
        crate::handlers::cart::remove_from_cart,
        crate::handlers::cart::decrement_item,

        crate::handlers::checkout::checkout_page,
        crate::handlers::checkout::checkout,

        crate::handlers::payments::payment_start,
        crate::handlers::payments::charge_card,
        crate::handlers::payments::complete_payment,
        crate::handlers::payments::verify_payment,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::order_summary,
        crate::handlers::orders::latest_orders,
        crate::handlers::orders::update_status,
        crate::handlers::orders::order_feed,

        crate::handlers::articles::list_articles,
        crate::handlers::articles::get_article,
        crate::handlers::articles::add_comment,
        crate::handlers::articles::publish_article,

        crate::handlers::accounts::signup,
        crate::handlers::accounts::login,
        crate::handlers::accounts::request_password_reset,
        crate::handlers::accounts::confirm_password_reset,
        crate::handlers::accounts::get_profile,
        crate::handlers::accounts::update_profile,
        crate::handlers::accounts::change_password,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::health::HealthInfo,
            crate::health::HealthStatus,
            crate::entities::item::Model,
            crate::entities::ItemCategory,
            crate::entities::ItemLabel,
            crate::entities::Packaging,
            crate::entities::DeliveryStatus,
            crate::entities::ArticleCategory,
            crate::entities::ArticleStatus,
            crate::services::catalog::ItemRequest,
            crate::services::catalog::DealRequest,
            crate::services::catalog::StockRequest,
            crate::services::catalog::DealView,
            crate::services::catalog::StockView,
            crate::services::catalog::HomePage,
            crate::services::cart::CartNotice,
            crate::services::cart::CartOutcome,
            crate::services::checkout::CheckoutForm,
            crate::services::checkout::CheckoutResponse,
            crate::services::checkout::PaymentMethod,
            crate::services::checkout::PaymentStart,
            crate::services::open_order::OrderSummary,
            crate::services::open_order::OrderLineView,
            crate::services::payments::CardChargeForm,
            crate::services::payments::PaymentOutcome,
            crate::services::payments::VerificationReport,
            crate::services::orders::OrderView,
            crate::services::orders::LatestOrder,
            crate::services::orders::SnapshotUser,
            crate::services::orders::UpdateOrderStatusRequest,
            crate::services::articles::PublishArticleRequest,
            crate::services::articles::CommentRequest,
            crate::services::articles::ArticleView,
            crate::services::articles::CommentView,
            crate::services::articles::ArticleDetail,
            crate::services::accounts::SignupRequest,
            crate::services::accounts::LoginRequest,
            crate::services::accounts::UpdateProfileRequest,
            crate::services::accounts::ChangePasswordRequest,
            crate::services::accounts::PasswordResetRequest,
            crate::services::accounts::PasswordResetConfirm,
            crate::services::accounts::Profile,
            crate::services::accounts::MessageResponse,
            crate::auth::TokenResponse,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_storefront_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/cart/add/{item_id}"));
        assert!(json.contains("/api/v1/payments/complete"));
        assert!(json.contains("bearer_auth"));
    }
}
