mod common;

use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

fn item_body(name: &str, initial: i32, topup: i32) -> serde_json::Value {
    json!({
        "name": name,
        "price": "12.50",
        "discount_price": "10.00",
        "category": "S",
        "label": "BS",
        "description": "Smoked over hardwood",
        "initial_stock": initial,
        "topup_stock": topup
    })
}

#[tokio::test]
async fn staff_create_items_with_derived_total_stock() {
    let app = TestApp::new().await;

    let response = app
        .request_as_staff(Method::POST, "/api/v1/items", Some(item_body("Smoked catfish", 10, 5)))
        .await;
    assert_eq!(response.status(), 201);
    let item = response_json(response).await;
    assert_eq!(item["total_stock"], 15);
    assert_eq!(item["current_stock"], 15);
    assert_eq!(item["category"], "S");
    assert_eq!(item["image"], "products/default.jpg");

    let id = item["id"].as_str().unwrap();
    let updated = app
        .request_as_staff(
            Method::PUT,
            &format!("/api/v1/items/{}", id),
            Some(item_body("Smoked catfish", 10, 20)),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let updated = response_json(updated).await;
    assert_eq!(updated["total_stock"], 30);
    // current stock only moves when given explicitly
    assert_eq!(updated["current_stock"], 15);
}

#[tokio::test]
async fn shoppers_cannot_edit_the_catalog() {
    let app = TestApp::new().await;

    let response = app
        .request_as_shopper(Method::POST, "/api/v1/items", Some(item_body("Catfish", 1, 0)))
        .await;
    assert_eq!(response.status(), 403);

    let anonymous = app
        .request(Method::POST, "/api/v1/items", Some(item_body("Catfish", 1, 0)))
        .await;
    assert_eq!(anonymous.status(), 401);
}

#[tokio::test]
async fn invalid_items_are_rejected() {
    let app = TestApp::new().await;

    let mut body = item_body("Catfish", 1, 0);
    body["price"] = json!("-3.00");
    let response = app.request_as_staff(Method::POST, "/api/v1/items", Some(body)).await;
    assert_eq!(response.status(), 400);

    let malformed = app
        .request_as_staff(Method::POST, "/api/v1/items", Some(json!({ "name": "Catfish" })))
        .await;
    assert_eq!(malformed.status(), 400);
}

#[tokio::test]
async fn catalog_is_public() {
    let app = TestApp::new().await;
    let item = app.create_item("Palm oil", dec!(22.00), None, 4).await;

    let listed = response_json(app.request(Method::GET, "/api/v1/items", None).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let detail = app
        .request(Method::GET, &format!("/api/v1/items/{}", item.id), None)
        .await;
    assert_eq!(detail.status(), 200);
    let detail = response_json(detail).await;
    assert_eq!(detail["name"], "Palm oil");
    assert_eq!(decimal(&detail["price"]), dec!(22.00));

    let missing = app
        .request(Method::GET, &format!("/api/v1/items/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn home_shows_the_newest_deal() {
    let app = TestApp::new().await;
    let item = app.create_item("Catfish", dec!(12.50), None, 4).await;

    let home = response_json(app.request(Method::GET, "/api/v1", None).await).await;
    assert!(home["deal"].is_null());
    assert_eq!(home["items"].as_array().unwrap().len(), 1);

    let created = app
        .request_as_staff(
            Method::POST,
            "/api/v1/deals",
            Some(json!({
                "item_id": item.id,
                "price": "9.00",
                "packaging": "0",
                "deal": 20,
                "title": "Catfish week"
            })),
        )
        .await;
    assert_eq!(created.status(), 201);

    let home = response_json(app.request(Method::GET, "/api/v1", None).await).await;
    assert_eq!(home["deal"]["title"], "Catfish week");
    assert_eq!(home["deal"]["packaging"], "0");

    let deals = response_json(app.request(Method::GET, "/api/v1/deals", None).await).await;
    assert_eq!(deals.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deals_need_an_existing_item() {
    let app = TestApp::new().await;

    let response = app
        .request_as_staff(
            Method::POST,
            "/api/v1/deals",
            Some(json!({
                "item_id": uuid::Uuid::new_v4(),
                "price": "9.00",
                "deal": 10,
                "title": "Ghost deal"
            })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn stock_ledger_is_staff_only() {
    let app = TestApp::new().await;
    let item = app.create_item("Honey", dec!(14.00), None, 4).await;

    let created = app
        .request_as_staff(
            Method::POST,
            "/api/v1/stock",
            Some(json!({ "item_id": item.id, "initial_stock": 40, "current_stock": 32 })),
        )
        .await;
    assert_eq!(created.status(), 201);

    let listed = response_json(app.request_as_staff(Method::GET, "/api/v1/stock", None).await).await;
    assert_eq!(listed[0]["current_stock"], 32);

    let shopper = app.request_as_shopper(Method::GET, "/api/v1/stock", None).await;
    assert_eq!(shopper.status(), 403);
}
