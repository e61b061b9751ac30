#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use epack_api::{
    app_router,
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use fake::{
    faker::{address::en::CityName, company::en::CompanyName, name::en::Name},
    Fake,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Application harness backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after `tweak` adjusts the default configuration.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = db_dir.path().join("epack_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, Some(EventSender::new(event_tx)));
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response")
    }

    /// Sends a request and returns the status with the decoded JSON body.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_order(&self, email: &str) -> Value {
        let (status, body) = self
            .json(Method::POST, "/api/v1/orders", Some(order_payload(email)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create order failed: {body}");
        body["data"].clone()
    }

    pub async fn set_order_status(&self, order_id: &str, status: &str) -> (StatusCode, Value) {
        self.json(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/status"),
            Some(json!({ "status": status, "changed_by": "tester" })),
        )
        .await
    }

    /// Applies each status in turn, asserting every step succeeds.
    pub async fn move_order_to(&self, order_id: &str, steps: &[&str]) {
        for step in steps {
            let (status, body) = self.set_order_status(order_id, step).await;
            assert_eq!(status, StatusCode::OK, "moving to {step} failed: {body}");
        }
    }

    /// An order at `DATA_RECEIVED` with its work order issued. Returns `(order_id, work_order)`.
    pub async fn order_with_work_order(&self, email: &str) -> (String, Value) {
        let order = self.create_order(email).await;
        let order_id = order["id"].as_str().expect("order id").to_string();
        self.move_order_to(&order_id, &["QUOTATION", "DATA_RECEIVED"])
            .await;

        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/work-orders",
                Some(json!({ "order_id": order_id, "created_by": "planner" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create work order failed: {body}");
        (order_id, body["data"].clone())
    }

    pub async fn advance(&self, work_order_id: &str) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            &format!("/api/v1/work-orders/{work_order_id}/advance"),
            Some(json!({ "performed_by": "line-1" })),
        )
        .await
    }

    /// Runs an order through contract and all production stages so it sits at `STOCK_IN`.
    pub async fn order_in_stock(&self, email: &str) -> String {
        let (order_id, work_order) = self.order_with_work_order(email).await;
        self.move_order_to(&order_id, &["CONTRACT_SENT", "CONTRACT_SIGNED"])
            .await;
        let work_order_id = work_order["id"].as_str().expect("work order id");
        for _ in 0..9 {
            let (status, body) = self.advance(work_order_id).await;
            assert_eq!(status, StatusCode::OK, "advance failed: {body}");
        }
        order_id
    }

    pub async fn order_status(&self, order_id: &str) -> String {
        let (_, body) = self
            .json(Method::GET, &format!("/api/v1/orders/{order_id}"), None)
            .await;
        body["data"]["status"]
            .as_str()
            .expect("order status")
            .to_string()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn order_payload(email: &str) -> Value {
    let city: String = CityName().fake();
    json!({
        "customer_name": Name().fake::<String>(),
        "customer_email": email,
        "company_name": CompanyName().fake::<String>(),
        "shipping_address": format!("1-2-3 Chuo, {city}"),
        "items": [
            {
                "product_name": "Stand-up pouch 130x200",
                "quantity": 1000,
                "unit_price": "45.50"
            },
            {
                "product_name": "Flat pouch 100x150",
                "quantity": 2,
                "unit_price": "1000"
            }
        ],
        "created_by": "tester"
    })
}

pub fn quote_payload(quantity: u32) -> Value {
    json!({
        "bag_type_id": "flat_3_side",
        "material_id": "PET",
        "width": "100",
        "height": "150",
        "quantity": quantity
    })
}

pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
