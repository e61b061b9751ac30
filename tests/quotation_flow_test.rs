//! Quotation creation, approval and conversion into an order.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn quotation_payload() -> Value {
    json!({
        "customer_name": "Sakura Tea",
        "customer_email": "buyer@sakura-tea.example",
        "company_name": "Sakura Tea Co.",
        "items": [
            {
                "product_name": "Tea pouch, manual price",
                "quantity": 3,
                "unit_price": "12345"
            }
        ]
    })
}

async fn create_quotation(app: &TestApp, payload: Value) -> Value {
    let (status, body) = app
        .json(Method::POST, "/api/v1/quotations", Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn approve(app: &TestApp, id: &str) {
    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/v1/quotations/{id}/status"),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "APPROVED");
}

#[tokio::test]
async fn quotation_totals_include_rounded_tax() {
    let app = TestApp::new().await;
    let quotation = create_quotation(&app, quotation_payload()).await;

    // 3 x 12,345 = 37,035 -> 37,100; tax 3,710; total 40,810 -> 40,900
    assert_eq!(decimal(&quotation["subtotal"]), dec!(37100));
    assert_eq!(decimal(&quotation["tax_amount"]), dec!(3710));
    assert_eq!(decimal(&quotation["total_amount"]), dec!(40900));
    assert_eq!(quotation["status"], "QUOTATION_PENDING");
    assert_eq!(quotation["currency"], "JPY");
    assert_eq!(quotation["is_expired"], false);

    let number = quotation["quotation_number"].as_str().unwrap();
    assert!(number.starts_with("QT-"), "{number}");
    assert_eq!(quotation["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn quotation_numbers_increase() {
    let app = TestApp::new().await;
    let first = create_quotation(&app, quotation_payload()).await;
    let second = create_quotation(&app, quotation_payload()).await;

    let first = first["quotation_number"].as_str().unwrap().to_string();
    let second = second["quotation_number"].as_str().unwrap().to_string();
    assert!(second > first, "{first} then {second}");
}

#[tokio::test]
async fn items_with_a_specification_are_priced_by_the_quote_engine() {
    let app = TestApp::new().await;
    let payload = json!({
        "customer_name": "Sakura Tea",
        "customer_email": "buyer@sakura-tea.example",
        "items": [
            {
                "product_name": "Flat pouch 100x150",
                "quantity": 1000,
                "specification": {
                    "bag_type_id": "flat_3_side",
                    "material_id": "PET",
                    "width": "100",
                    "height": "150"
                }
            }
        ]
    });

    let quotation = create_quotation(&app, payload).await;
    let item = &quotation["items"][0];
    assert!(decimal(&item["unit_price"]) > dec!(0));
    assert!(decimal(&item["line_total"]) >= dec!(160000));
    assert!(item["specification"].is_object());
}

#[tokio::test]
async fn items_need_a_price_or_a_specification() {
    let app = TestApp::new().await;
    let payload = json!({
        "customer_name": "Sakura Tea",
        "customer_email": "buyer@sakura-tea.example",
        "items": [{ "product_name": "Mystery pouch", "quantity": 10 }]
    });

    let (status, _) = app
        .json(Method::POST, "/api/v1/quotations", Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_email_is_reported_as_a_validation_error() {
    let app = TestApp::new().await;
    let mut payload = quotation_payload();
    payload["customer_email"] = json!("not-an-email");

    let (status, body) = app
        .json(Method::POST, "/api/v1/quotations", Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().starts_with("customer_email")));
}

#[tokio::test]
async fn unapproved_quotations_cannot_be_converted() {
    let app = TestApp::new().await;
    let quotation = create_quotation(&app, quotation_payload()).await;
    let id = quotation["id"].as_str().unwrap();

    let (status, body) = app
        .json(Method::POST, &format!("/api/v1/quotations/{id}/convert"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("approved"));
}

#[tokio::test]
async fn conversion_creates_one_order() {
    let app = TestApp::new().await;
    let quotation = create_quotation(&app, quotation_payload()).await;
    let id = quotation["id"].as_str().unwrap();
    approve(&app, id).await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/quotations/{id}/convert"),
            Some(json!({ "shipping_address": "Shizuoka", "changed_by": "sales" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"]["order"];
    assert_eq!(body["data"]["already_converted"], false);
    assert_eq!(order["status"], "QUOTATION");
    assert_eq!(order["quotation_id"], id);
    assert_eq!(decimal(&order["total_amount"]), dec!(40900));
    let order_id = order["id"].as_str().unwrap().to_string();

    // A second conversion returns the same order.
    let (status, body) = app
        .json(Method::POST, &format!("/api/v1/quotations/{id}/convert"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["already_converted"], true);
    assert_eq!(body["data"]["order"]["id"], order_id.as_str());

    let (_, body) = app
        .json(Method::GET, &format!("/api/v1/quotations/{id}"), None)
        .await;
    assert_eq!(body["data"]["status"], "CONVERTED");
    assert_eq!(body["data"]["order_id"], order_id.as_str());

    let (_, body) = app.json(Method::GET, "/api/v1/orders", None).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn converted_is_not_a_manual_status() {
    let app = TestApp::new().await;
    let quotation = create_quotation(&app, quotation_payload()).await;
    let id = quotation["id"].as_str().unwrap();

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/api/v1/quotations/{id}/status"),
            Some(json!({ "status": "CONVERTED" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_by_status() {
    let app = TestApp::new().await;
    let first = create_quotation(&app, quotation_payload()).await;
    create_quotation(&app, quotation_payload()).await;
    approve(&app, first["id"].as_str().unwrap()).await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/quotations?status=APPROVED", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], first["id"]);

    let (_, body) = app
        .json(Method::GET, "/api/v1/quotations?page=1&limit=1", None)
        .await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_quotation_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .json(
            Method::GET,
            "/api/v1/quotations/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
