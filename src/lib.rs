//! ePackage API library
//!
//! Quote engine, quotations, orders, production tracking and shipment tracking for a custom
//! pouch packaging manufacturer.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Option<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Option<events::EventSender>,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    let quotes = Router::new()
        .route("/calculate", post(handlers::pricing::calculate_quote))
        .route("/sku-cost", post(handlers::pricing::calculate_sku_cost))
        .route("/film-cost", post(handlers::pricing::calculate_film_cost))
        .route(
            "/economic-quantity",
            post(handlers::pricing::economic_quantity),
        )
        .route("/compare", post(handlers::pricing::compare_quantities))
        .route(
            "/parallel-discount",
            post(handlers::pricing::parallel_discount),
        )
        .route("/cache", delete(handlers::pricing::clear_cache));

    let quotations = Router::new()
        .route(
            "/",
            get(handlers::quotations::list_quotations).post(handlers::quotations::create_quotation),
        )
        .route("/:id", get(handlers::quotations::get_quotation))
        .route(
            "/:id/status",
            put(handlers::quotations::update_quotation_status),
        )
        .route("/:id/convert", post(handlers::quotations::convert_quotation));

    let orders = Router::new()
        .route(
            "/",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/:id",
            get(handlers::orders::get_order).put(handlers::orders::update_order),
        )
        .route("/:id/status", put(handlers::orders::update_order_status))
        .route("/:id/cancel", post(handlers::orders::cancel_order))
        .route("/:id/reorder", post(handlers::orders::reorder))
        .route("/:id/history", get(handlers::orders::order_history))
        .route(
            "/:id/work-order",
            get(handlers::work_orders::get_work_order_for_order),
        );

    let work_orders = Router::new()
        .route("/", post(handlers::work_orders::create_work_order))
        .route("/:id", get(handlers::work_orders::get_work_order))
        .route("/:id/advance", post(handlers::work_orders::advance_stage))
        .route("/:id/rollback", post(handlers::work_orders::rollback_stage))
        .route(
            "/:id/stages/:stage/notes",
            post(handlers::work_orders::add_stage_note),
        )
        .route(
            "/:id/stages/:stage/assign",
            post(handlers::work_orders::assign_stage),
        )
        .route(
            "/:id/history",
            get(handlers::work_orders::work_order_history),
        )
        .route(
            "/:id/estimate",
            get(handlers::work_orders::estimate_completion),
        );

    let shipments = Router::new()
        .route(
            "/",
            get(handlers::shipments::list_shipments).post(handlers::shipments::create_shipment),
        )
        .route(
            "/batch-status",
            post(handlers::shipments::batch_update_status),
        )
        .route(
            "/track/:tracking_number",
            get(handlers::shipments::track_shipment),
        )
        .route("/:id", get(handlers::shipments::get_shipment))
        .route("/:id/tracking", post(handlers::shipments::record_tracking));

    Router::new()
        .nest("/quotes", quotes)
        .nest("/quotations", quotations)
        .nest("/orders", orders)
        .nest("/work-orders", work_orders)
        .nest("/shipments", shipments)
}

/// Full application router with health, API, Swagger UI and the shared layers.
///
/// CORS is left to the caller since it depends on the deployment environment.
pub fn app_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
