#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{item, user, ItemCategory, ItemLabel},
    events::{self, EventHandler, EventSender, Feed},
    handlers::AppServices,
    notifications::RecordingMailer,
    payments::{
        CardGateway, Charge, ChargeRequest, GatewayError, PaymentGateways, VerificationGateway,
        VerifiedTransaction,
    },
    services::orders::{OrderFeedPublisher, OrderService, ORDERS_TOPIC},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "storefront_test_secret_key_for_hs256_signing_only";

/// Card gateway that answers every charge with the same result
pub struct FakeCardGateway {
    result: Result<Charge, GatewayError>,
    calls: Mutex<Vec<ChargeRequest>>,
}

impl FakeCardGateway {
    pub fn approving() -> Self {
        Self {
            result: Ok(Charge {
                id: "ch_test_123".to_string(),
                status: "succeeded".to_string(),
                amount_minor: 0,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ChargeRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardGateway for FakeCardGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<Charge, GatewayError> {
        let amount_minor = request.amount_minor;
        self.calls.lock().unwrap().push(request);
        self.result.clone().map(|charge| Charge {
            amount_minor,
            ..charge
        })
    }
}

/// Redirect gateway that confirms any reference for a fixed amount
pub struct FakeVerifier {
    provider: &'static str,
    amount: Decimal,
    failure: Option<GatewayError>,
}

impl FakeVerifier {
    pub fn confirming(provider: &'static str, amount: Decimal) -> Self {
        Self {
            provider,
            amount,
            failure: None,
        }
    }

    pub fn rejecting(provider: &'static str, error: GatewayError) -> Self {
        Self {
            provider,
            amount: Decimal::ZERO,
            failure: Some(error),
        }
    }
}

#[async_trait]
impl VerificationGateway for FakeVerifier {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(VerifiedTransaction {
            transaction_id: format!("txn-{}", reference),
            status: "successful".to_string(),
            reference: reference.to_string(),
            amount: self.amount,
        })
    }
}

pub fn default_gateways() -> PaymentGateways {
    PaymentGateways::new(
        Arc::new(FakeCardGateway::approving()),
        Arc::new(FakeVerifier::confirming("paystack", Decimal::new(2500, 2))),
        Arc::new(FakeVerifier::confirming("flutterwave", Decimal::new(2500, 2))),
    )
}

/// Application backed by a throwaway SQLite file, with one shopper and one
/// staff account already signed in.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthService>,
    pub mailer: RecordingMailer,
    pub shopper: user::Model,
    pub staff: user::Model,
    shopper_token: String,
    staff_token: String,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_gateways(default_gateways()).await
    }

    pub async fn with_gateways(gateways: PaymentGateways) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for sqlite");
        let db_path = db_dir.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        cfg.public_base_url = "http://shop.test".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
        let event_sender = Arc::new(event_sender);
        let order_feed = Feed::new(ORDERS_TOPIC, cfg.order_feed_capacity);
        let publisher: Arc<dyn EventHandler> = Arc::new(OrderFeedPublisher::new(
            OrderService::new(db_arc.clone(), None),
            order_feed.clone(),
        ));
        let event_task = tokio::spawn(events::process_events(event_rx, vec![publisher]));

        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let mailer = RecordingMailer::new();

        let services = AppServices::new(
            db_arc.clone(),
            &cfg,
            event_sender,
            auth.clone(),
            gateways,
            Arc::new(mailer.clone()),
        );

        let state = AppState {
            db: db_arc.clone(),
            config: cfg,
            services,
            auth: auth.clone(),
            order_feed,
        };

        let shopper = insert_user(&db_arc, "shopper", false).await;
        let staff = insert_user(&db_arc, "staff", true).await;
        let shopper_token = auth
            .generate_token(&shopper)
            .expect("shopper token")
            .access_token;
        let staff_token = auth
            .generate_token(&staff)
            .expect("staff token")
            .access_token;

        Self {
            router: storefront_api::app_router(state.clone()),
            state,
            db: db_arc,
            auth,
            mailer,
            shopper,
            staff,
            shopper_token,
            staff_token,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    pub fn shopper_token(&self) -> &str {
        &self.shopper_token
    }

    pub fn staff_token(&self) -> &str {
        &self.staff_token
    }

    /// Signs in an extra shopper
    pub async fn another_shopper(&self, username: &str) -> (user::Model, String) {
        let user = insert_user(&self.db, username, false).await;
        let token = self
            .auth
            .generate_token(&user)
            .expect("token for extra shopper")
            .access_token;
        (user, token)
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, body, None).await
    }

    pub async fn request_as_shopper(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.send(method, uri, body, Some(&self.shopper_token)).await
    }

    pub async fn request_as_staff(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, body, Some(&self.staff_token)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    pub async fn create_item(
        &self,
        name: &str,
        price: Decimal,
        discount_price: Option<Decimal>,
        stock: i32,
    ) -> item::Model {
        let now = Utc::now();
        item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            discount_price: Set(discount_price),
            category: Set(ItemCategory::Fish),
            label: Set(ItemLabel::New),
            description: Set(format!("{} for tests", name)),
            image: Set(item::DEFAULT_IMAGE.to_string()),
            initial_stock: Set(stock),
            topup_stock: Set(0),
            total_stock: Set(0),
            current_stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("insert test item")
    }

    pub async fn item(&self, id: Uuid) -> item::Model {
        item::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .expect("load item")
            .expect("item exists")
    }

    /// Puts `item` in the shopper's cart and saves a shipping address
    pub async fn checked_out_cart(&self, item: &item::Model, payment_option: &str) -> Value {
        let added = self
            .request_as_shopper(Method::POST, &format!("/api/v1/cart/add/{}", item.id), None)
            .await;
        assert_eq!(added.status(), 200);

        let response = self
            .request_as_shopper(
                Method::POST,
                "/api/v1/checkout",
                Some(serde_json::json!({
                    "street_address": "12 Marina Road",
                    "zip": "101001",
                    "phone": "08012345678",
                    "payment_option": payment_option
                })),
            )
            .await;
        assert_eq!(response.status(), 200);
        response_json(response).await
    }
}

async fn insert_user(db: &DatabaseConnection, username: &str, is_staff: bool) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{}@storefront.test", username)),
        first_name: Set(username.to_string()),
        last_name: Set("Tester".to_string()),
        password_hash: Set(String::new()),
        is_staff: Set(is_staff),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert test user")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimal fields serialize as strings
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64().and_then(|f| Decimal::try_from(f).ok()))
        .unwrap_or_else(|| panic!("not a decimal: {}", value))
}
