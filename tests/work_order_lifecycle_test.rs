//! Work orders through the nine production stages and their effect on the order.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

const STAGES: [&str; 9] = [
    "DESIGN",
    "PROOFING",
    "PLATE_MAKING",
    "PRINTING",
    "LAMINATION",
    "SLITTING",
    "BAG_MAKING",
    "QC",
    "PACKAGING",
];

#[tokio::test]
async fn issuing_a_work_order_creates_nine_stages() {
    let app = TestApp::new().await;
    let (order_id, work_order) = app.order_with_work_order("wo-new@example.com").await;

    assert_eq!(work_order["current_stage"], "DESIGN");
    assert_eq!(work_order["status"], "in_progress");
    assert_eq!(work_order["priority"], "normal");
    assert_eq!(work_order["progress_percent"], 0);
    let number = work_order["work_order_number"].as_str().unwrap();
    assert!(number.starts_with("WO-"), "{number}");

    let stages = work_order["stages"].as_array().unwrap();
    let names: Vec<&str> = stages.iter().map(|s| s["stage"].as_str().unwrap()).collect();
    assert_eq!(names, STAGES);
    assert_eq!(stages[0]["status"], "in_progress");
    assert!(stages[1..].iter().all(|s| s["status"] == "pending"));

    assert_eq!(app.order_status(&order_id).await, "WORK_ORDER");
}

#[tokio::test]
async fn issuing_twice_returns_the_same_work_order() {
    let app = TestApp::new().await;
    let (order_id, work_order) = app.order_with_work_order("wo-twice@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/work-orders",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], work_order["id"]);

    let (status, body) = app
        .json(
            Method::GET,
            &format!("/api/v1/orders/{order_id}/work-order"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], work_order["id"]);
}

#[tokio::test]
async fn cancelled_orders_cannot_start_production() {
    let app = TestApp::new().await;
    let order = app.create_order("wo-cancelled@example.com").await;
    let order_id = order["id"].as_str().unwrap();
    app.move_order_to(order_id, &["CANCELLED"]).await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/work-orders",
            Some(json!({ "order_id": order_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_production_run_moves_the_order_to_stock_in() {
    let app = TestApp::new().await;
    let (order_id, work_order) = app.order_with_work_order("wo-run@example.com").await;
    let id = work_order["id"].as_str().unwrap();
    app.move_order_to(&order_id, &["CONTRACT_SENT", "CONTRACT_SIGNED"])
        .await;

    let (status, body) = app.advance(id).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["current_stage"], "PROOFING");
    assert_eq!(body["data"]["stages"][0]["status"], "completed");
    assert_eq!(body["data"]["stages"][0]["completed_by"], "line-1");
    assert_eq!(app.order_status(&order_id).await, "PRODUCTION");

    for _ in 1..8 {
        let (status, _) = app.advance(id).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = app
        .json(Method::GET, &format!("/api/v1/work-orders/{id}"), None)
        .await;
    assert_eq!(body["data"]["current_stage"], "PACKAGING");
    assert_eq!(body["data"]["progress_percent"], 89);

    let (status, body) = app.advance(id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress_percent"], 100);
    assert!(body["data"]["completed_at"].is_string());
    assert_eq!(app.order_status(&order_id).await, "STOCK_IN");

    let (status, _) = app.advance(id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advancing_before_the_contract_leaves_the_order_alone() {
    let app = TestApp::new().await;
    let (order_id, work_order) = app.order_with_work_order("wo-early@example.com").await;

    let (status, _) = app.advance(work_order["id"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.order_status(&order_id).await, "WORK_ORDER");
}

#[tokio::test]
async fn rollback_reopens_the_previous_stage() {
    let app = TestApp::new().await;
    let (_, work_order) = app.order_with_work_order("wo-rollback@example.com").await;
    let id = work_order["id"].as_str().unwrap();

    let (status, _) = app
        .json(Method::POST, &format!("/api/v1/work-orders/{id}/rollback"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "first stage cannot roll back");

    app.advance(id).await;
    app.advance(id).await;
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/work-orders/{id}/rollback"),
            Some(json!({ "performed_by": "qa", "reason": "colour mismatch" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["current_stage"], "PROOFING");
    assert_eq!(data["stages"][1]["status"], "in_progress");
    assert!(data["stages"][1]["completed_at"].is_null());
    assert_eq!(data["stages"][2]["status"], "pending");
    assert!(data["stages"][2]["started_at"].is_null());
}

#[tokio::test]
async fn notes_and_assignments_are_kept_per_stage() {
    let app = TestApp::new().await;
    let (_, work_order) = app.order_with_work_order("wo-notes@example.com").await;
    let id = work_order["id"].as_str().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/v1/work-orders/{id}/stages/printing/notes"),
            Some(json!({ "note": "Use spot colour 186C", "author": "designer" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/work-orders/{id}/stages/PRINTING/notes"),
            Some(json!({ "note": "Check registration" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let notes = body["data"]["stages"][3]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes[0].as_str().unwrap().ends_with("designer: Use spot colour 186C"));
    assert!(notes[1].as_str().unwrap().ends_with("system: Check registration"));

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/v1/work-orders/{id}/stages/LAMINATION/assign"),
            Some(json!({ "assignee": "Tanaka", "assigned_by": "planner" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stages"][4]["assigned_to"], "Tanaka");

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/v1/work-orders/{id}/stages/EMBOSSING/notes"),
            Some(json!({ "note": "?" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .json(Method::GET, &format!("/api/v1/work-orders/{id}/history"), None)
        .await;
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["note_added", "note_added", "assigned"]);
}

#[tokio::test]
async fn estimate_covers_every_stage() {
    let app = TestApp::new().await;
    let (_, work_order) = app.order_with_work_order("wo-estimate@example.com").await;
    let id = work_order["id"].as_str().unwrap();
    app.advance(id).await;

    let (status, body) = app
        .json(Method::GET, &format!("/api/v1/work-orders/{id}/estimate"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["stages"].as_array().unwrap().len(), 9);
    assert_eq!(data["summary"]["current_stage"], "PROOFING");
    assert_eq!(data["summary"]["completed_stages"], 1);
    assert_eq!(data["summary"]["total_stages"], 9);
    assert_eq!(data["summary"]["is_complete"], false);
    assert!(data["summary"]["remaining_hours"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn unknown_work_order_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .json(
            Method::GET,
            "/api/v1/work-orders/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
