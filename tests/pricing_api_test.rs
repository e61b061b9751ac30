//! HTTP tests for the quote engine endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, quote_payload, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn root_and_health_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = app.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["details"]["database"]["status"], "up");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn calculates_a_pouch_quote() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/quotes/calculate", Some(quote_payload(1000)))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let quote = &body["data"];
    assert_eq!(quote["currency"], "JPY");
    assert_eq!(quote["quantity"], 1000);
    assert_eq!(quote["min_order_quantity"], 100);
    assert!(decimal(&quote["total_price"]) >= dec!(160000));
    assert!(decimal(&quote["unit_price"]) > dec!(0));
}

#[tokio::test]
async fn rejects_quantities_below_the_minimum() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/quotes/calculate", Some(quote_payload(50)))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Quantity 50"));
}

#[tokio::test]
async fn rejects_unknown_bag_types() {
    let app = TestApp::new().await;
    let mut payload = quote_payload(1000);
    payload["bag_type_id"] = json!("paper_cup");

    let (status, body) = app
        .json(Method::POST, "/api/v1/quotes/calculate", Some(payload))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("paper_cup"));
}

#[tokio::test]
async fn compares_several_quantities() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/quotes/compare",
            Some(json!({
                "base": quote_payload(1000),
                "quantities": [5000, 1000, 3000, 1000]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let quotes = body["data"]["quotes"].as_array().unwrap();
    let quantities: Vec<u64> = quotes
        .iter()
        .map(|q| q["quantity"].as_u64().unwrap())
        .collect();
    assert_eq!(quantities, vec![1000, 3000, 5000]);
}

#[tokio::test]
async fn parallel_discount_breakdown() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/quotes/parallel-discount",
            Some(json!({ "base_price": "10000", "parallel_count": 3 })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["data"]["original_price"]), dec!(30000));
    assert_eq!(decimal(&body["data"]["discounted_price"]), dec!(19000));
}

#[tokio::test]
async fn zero_parallel_lanes_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/quotes/parallel-discount",
            Some(json!({ "base_price": "10000", "parallel_count": 0 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_parallel_base_price_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/quotes/parallel-discount",
            Some(json!({ "base_price": "79228162514264337593543950335", "parallel_count": 100 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn film_cost_for_a_three_layer_laminate() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/quotes/film-cost",
            Some(json!({
                "layers": [
                    { "material_id": "PET", "thickness": 12 },
                    { "material_id": "AL", "thickness": 7 },
                    { "material_id": "LLDPE", "thickness": 60 }
                ],
                "width": "760",
                "length": "2000"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert!(decimal(&data["material_cost"]) > dec!(0));
    assert!(decimal(&data["cost_with_duty_jpy"]) > decimal(&data["cost_jpy"]));
}

#[tokio::test]
async fn clearing_the_cache_reports_dropped_entries() {
    let app = TestApp::new().await;

    let (status, _) = app
        .json(Method::POST, "/api/v1/quotes/calculate", Some(quote_payload(2000)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json(Method::DELETE, "/api/v1/quotes/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared_entries"], 1);

    let (_, body) = app.json(Method::DELETE, "/api/v1/quotes/cache", None).await;
    assert_eq!(body["data"]["cleared_entries"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let (status, body) = app.json(Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "ePackage API");
}
