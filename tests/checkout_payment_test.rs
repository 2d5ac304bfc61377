//! Checkout and the three payment flows: card charge, redirect completion
//! and verification-only checks.

mod common;

use std::sync::Arc;

use axum::http::Method;
use common::{decimal, default_gateways, response_json, FakeCardGateway, FakeVerifier, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use storefront_api::{
    entities::{order, order_item, payment},
    payments::{GatewayError, PaymentGateways},
};
use uuid::Uuid;

async fn payments_for(app: &TestApp, tx_ref: &str) -> Vec<payment::Model> {
    payment::Entity::find()
        .filter(payment::Column::TxRef.eq(tx_ref))
        .all(&*app.db)
        .await
        .expect("load payments")
}

async fn load_order(app: &TestApp, id: &str) -> order::Model {
    order::Entity::find_by_id(Uuid::parse_str(id).expect("order id"))
        .one(&*app.db)
        .await
        .expect("load order")
        .expect("order exists")
}

#[tokio::test]
async fn checkout_without_an_open_order_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "street_address": "12 Marina Road",
                "zip": "101001",
                "phone": "08012345678",
                "payment_option": "S"
            })),
        )
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(response_json(response).await["message"], "You do not have an order");

    let page = app
        .request_as_shopper(Method::GET, "/api/v1/checkout", None)
        .await;
    assert_eq!(page.status(), 404);
}

#[tokio::test]
async fn checkout_rejects_unknown_payment_options() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(12.50), None, 5).await;
    app.request_as_shopper(Method::POST, &format!("/api/v1/cart/add/{}", item.id), None)
        .await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "street_address": "12 Marina Road",
                "zip": "101001",
                "phone": "08012345678",
                "payment_option": "X"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response_json(response).await["message"], "Invalid Payment option");
}

#[tokio::test]
async fn checkout_validates_the_address_form() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(12.50), None, 5).await;
    app.request_as_shopper(Method::POST, &format!("/api/v1/cart/add/{}", item.id), None)
        .await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "street_address": "12 Marina Road",
                "zip": "101001",
                "phone": "080123456789012"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn checkout_points_at_the_chosen_payment_page() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(12.50), None, 5).await;

    let checkout = app.checked_out_cart(&item, "P").await;
    assert_eq!(checkout["payment_method"], "paystack");
    assert_eq!(checkout["next"], "/api/v1/payment/paypal");

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert_eq!(
        order.checkout_address_id.map(|id| id.to_string()),
        checkout["checkout_address_id"].as_str().map(str::to_string)
    );

    let start = app
        .request_as_shopper(Method::GET, "/api/v1/payment/paypal", None)
        .await;
    assert_eq!(start.status(), 200);
    let start = response_json(start).await;
    assert_eq!(decimal(&start["total"]), dec!(12.50));
    assert_eq!(start["currency"], "usd");

    let unknown = app
        .request_as_shopper(Method::GET, "/api/v1/payment/bitcoin", None)
        .await;
    assert_eq!(unknown.status(), 400);
}

#[tokio::test]
async fn card_charge_finalizes_the_order() {
    let card = Arc::new(FakeCardGateway::approving());
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        card.clone(),
        defaults.paystack,
        defaults.flutterwave,
    ))
    .await;
    let item = app.create_item("Palm oil", dec!(22.00), Some(dec!(19.50)), 5).await;
    let checkout = app.checked_out_cart(&item, "S").await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/payment/stripe",
            Some(json!({ "stripe_token": "tok_visa" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(outcome["message"], "Success make an order");
    assert_eq!(outcome["order_id"], checkout["order_id"]);
    assert_eq!(decimal(&outcome["amount"]), dec!(19.50));

    let calls = card.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor, 1950);
    assert_eq!(calls[0].source, "tok_visa");

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert!(order.ordered);
    assert_eq!(order.payment_id.map(|id| id.to_string()).as_deref(), outcome["payment_id"].as_str());

    let open_lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .filter(order_item::Column::Ordered.eq(false))
        .count(&*app.db)
        .await
        .unwrap();
    assert_eq!(open_lines, 0);

    let summary = app
        .request_as_shopper(Method::GET, "/api/v1/order-summary", None)
        .await;
    assert_eq!(summary.status(), 404);
}

#[tokio::test]
async fn card_charge_bills_the_discounted_total_of_every_line() {
    let card = Arc::new(FakeCardGateway::approving());
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        card.clone(),
        defaults.paystack,
        defaults.flutterwave,
    ))
    .await;
    let discounted = app.create_item("Smoked fish", dec!(10.00), Some(dec!(8.00)), 5).await;
    let plain = app.create_item("Kernel oil", dec!(5.00), None, 5).await;

    app.request_as_shopper(Method::POST, &format!("/api/v1/cart/add/{}", discounted.id), None)
        .await;
    let checkout = app.checked_out_cart(&discounted, "S").await;
    app.request_as_shopper(Method::POST, &format!("/api/v1/cart/add/{}", plain.id), None)
        .await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/payment/stripe",
            Some(json!({ "stripe_token": "tok_mastercard" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let outcome = response_json(response).await;
    assert_eq!(decimal(&outcome["amount"]), dec!(21.00));

    let calls = card.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].amount_minor, 2100);

    let recorded = payment::Entity::find()
        .filter(payment::Column::UserId.eq(app.shopper.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount, dec!(21.00));

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert!(order.ordered);
    let ordered_lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .filter(order_item::Column::Ordered.eq(true))
        .count(&*app.db)
        .await
        .unwrap();
    assert_eq!(ordered_lines, 2);
}

#[tokio::test]
async fn declined_card_keeps_the_order_open() {
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        Arc::new(FakeCardGateway::failing(GatewayError::CardDeclined(
            "Your card was declined.".into(),
        ))),
        defaults.paystack,
        defaults.flutterwave,
    ))
    .await;
    let item = app.create_item("Honey", dec!(14.00), None, 5).await;
    let checkout = app.checked_out_cart(&item, "S").await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/payment/stripe",
            Some(json!({ "stripe_token": "tok_chargeDeclined" })),
        )
        .await;
    assert_eq!(response.status(), 402);
    assert_eq!(response_json(response).await["message"], "Your card was declined.");

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert!(!order.ordered);
    assert!(order.payment_id.is_none());
}

#[tokio::test]
async fn rate_limited_card_charge_maps_to_shopper_message() {
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        Arc::new(FakeCardGateway::failing(GatewayError::RateLimited)),
        defaults.paystack,
        defaults.flutterwave,
    ))
    .await;
    let item = app.create_item("Honey", dec!(14.00), None, 5).await;
    app.checked_out_cart(&item, "S").await;

    let response = app
        .request_as_shopper(
            Method::POST,
            "/api/v1/payment/stripe",
            Some(json!({ "stripe_token": "tok_visa" })),
        )
        .await;
    assert_eq!(response.status(), 402);
    assert_eq!(response_json(response).await["message"], "To many request error");
}

#[tokio::test]
async fn redirect_completion_records_payment_and_replays_append() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(25.00), None, 5).await;
    let checkout = app.checked_out_cart(&item, "P").await;

    let first = app
        .request_as_shopper(Method::GET, "/api/v1/payments/complete?reference=ref-001", None)
        .await;
    assert_eq!(first.status(), 200);
    let outcome = response_json(first).await;
    assert_eq!(outcome["message"], "Your order was successful");
    assert_eq!(outcome["tx_ref"], "ref-001");
    assert_eq!(outcome["order_id"], checkout["order_id"]);

    let replay = app
        .request_as_shopper(Method::GET, "/api/v1/payments/complete?reference=ref-001", None)
        .await;
    assert_eq!(replay.status(), 200);
    let replayed = response_json(replay).await;
    assert_eq!(replayed["order_id"], checkout["order_id"]);

    assert_eq!(payments_for(&app, "ref-001").await.len(), 2);

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert_eq!(order.payment_id.map(|id| id.to_string()).as_deref(), replayed["payment_id"].as_str());
}

#[tokio::test]
async fn flutterwave_callback_uses_tx_ref() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(25.00), None, 5).await;
    app.checked_out_cart(&item, "F").await;

    let start = response_json(
        app.request_as_shopper(Method::GET, "/api/v1/payment/flutterwave", None)
            .await,
    )
    .await;
    assert_eq!(start["payment_method"], "flutterwave");

    let response = app
        .request_as_shopper(
            Method::GET,
            "/api/v1/payments/complete?tx_ref=flw-42&status=successful&transaction_id=99",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["transaction_id"], "txn-flw-42");
}

#[tokio::test]
async fn failed_verification_answers_payment_required() {
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        defaults.card,
        Arc::new(FakeVerifier::rejecting(
            "paystack",
            GatewayError::Verification("Transaction reference not found".into()),
        )),
        defaults.flutterwave,
    ))
    .await;
    let item = app.create_item("Catfish", dec!(25.00), None, 5).await;
    let checkout = app.checked_out_cart(&item, "P").await;

    let response = app
        .request_as_shopper(Method::GET, "/api/v1/payments/complete?reference=bad", None)
        .await;
    assert_eq!(response.status(), 402);
    assert_eq!(
        response_json(response).await["message"],
        "Transaction reference not found"
    );

    let order = load_order(&app, checkout["order_id"].as_str().unwrap()).await;
    assert!(!order.ordered);
}

#[tokio::test]
async fn completion_needs_a_reference() {
    let app = TestApp::new().await;

    let response = app
        .request_as_shopper(Method::GET, "/api/v1/payments/complete", None)
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn verify_only_reports_without_touching_orders() {
    let defaults = default_gateways();
    let app = TestApp::with_gateways(PaymentGateways::new(
        defaults.card,
        defaults.paystack,
        Arc::new(FakeVerifier::rejecting(
            "flutterwave",
            GatewayError::Verification("No transaction was found".into()),
        )),
    ))
    .await;

    let response = app
        .request_as_shopper(
            Method::GET,
            "/api/v1/payments/verify?tx_ref=flw-1&status=cancelled",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let report = response_json(response).await;
    assert_eq!(report["verified"], false);
    assert_eq!(report["message"], "Payment cancelled No transaction was found");

    let missing = app
        .request_as_shopper(Method::GET, "/api/v1/payments/verify", None)
        .await;
    assert_eq!(missing.status(), 400);
}
