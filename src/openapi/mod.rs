use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ePackage API",
        version = "1.0.0",
        description = r#"
# ePackage B2B Pouch Portal API

Quotes, quotations, orders, production tracking and shipments for printed flexible packaging.

## Features

- **Quote engine**: unified pouch and roll film pricing, SKU costing, film costing, economic quantity suggestions and multi-quantity comparison
- **Quotations**: customer quotations with tax-inclusive totals and one-step conversion to orders
- **Orders**: twelve-step order lifecycle with status history
- **Production**: nine-stage work orders with completion estimates on the factory calendar
- **Shipments**: domestic carriers, tracking numbers and tracking events

## Error Handling

Errors use a consistent body:

```json
{
  "error": "Bad Request",
  "message": "Invalid status: Cannot move order ORD-2025-M5X1Z2 from PENDING to SHIPPED",
  "request_id": "2f1c...",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, capped by configuration).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "quotes", description = "Quote engine"),
        (name = "quotations", description = "Customer quotations"),
        (name = "orders", description = "Order lifecycle"),
        (name = "work-orders", description = "Production tracking"),
        (name = "shipments", description = "Shipment tracking"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Quote engine
        crate::handlers::pricing::calculate_quote,
        crate::handlers::pricing::calculate_sku_cost,
        crate::handlers::pricing::calculate_film_cost,
        crate::handlers::pricing::economic_quantity,
        crate::handlers::pricing::compare_quantities,
        crate::handlers::pricing::parallel_discount,
        crate::handlers::pricing::clear_cache,

        // Quotations
        crate::handlers::quotations::create_quotation,
        crate::handlers::quotations::list_quotations,
        crate::handlers::quotations::get_quotation,
        crate::handlers::quotations::update_quotation_status,
        crate::handlers::quotations::convert_quotation,

        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::reorder,
        crate::handlers::orders::order_history,

        // Work orders
        crate::handlers::work_orders::create_work_order,
        crate::handlers::work_orders::get_work_order,
        crate::handlers::work_orders::get_work_order_for_order,
        crate::handlers::work_orders::advance_stage,
        crate::handlers::work_orders::rollback_stage,
        crate::handlers::work_orders::add_stage_note,
        crate::handlers::work_orders::assign_stage,
        crate::handlers::work_orders::work_order_history,
        crate::handlers::work_orders::estimate_completion,

        // Shipments
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::track_shipment,
        crate::handlers::shipments::record_tracking,
        crate::handlers::shipments::batch_update_status,

        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Status vocabularies
            crate::models::OrderStatus,
            crate::models::QuotationStatus,
            crate::models::ProductionStage,
            crate::models::StageStatus,
            crate::models::Priority,
            crate::models::Carrier,
            crate::models::ServiceType,
            crate::models::ShipmentStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
