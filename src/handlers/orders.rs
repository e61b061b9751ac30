use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::{page_and_limit, paginated, validation_failure},
    services::orders::{
        CancelOrderRequest, CreateOrderRequest, OrderDetailResponse, OrderFilter, OrderResponse,
        OrderStatusHistoryResponse, ReorderRequest, UpdateOrderDetailsRequest,
        UpdateOrderStatusRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Canonical, workflow or legacy status name
    pub status: Option<String>,
    pub customer_email: Option<String>,
}

/// Create an order directly, without a quotation
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderDetailResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetailResponse>>), ServiceError> {
    if let Err(errors) = request.validate() {
        return Ok(validation_failure(&errors));
    }
    let order = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders listed", body = ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let (page, limit) = page_and_limit(&state, query.page, query.limit);
    let filter = OrderFilter {
        status: query.status,
        customer_email: query.customer_email,
    };
    let (items, total) = state.services.orders.list_orders(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

/// Order with items and progress summary
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderDetailResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetailResponse> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderDetailsRequest,
    responses(
        (status = 200, description = "Order details updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order can no longer be edited", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderDetailsRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update_details(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order can no longer be cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelOrderRequest>>,
) -> ApiResult<OrderResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let order = state.services.orders.cancel_order(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Copy an order's items into a new pending order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/reorder",
    params(("id" = Uuid, Path, description = "Source order ID")),
    request_body = ReorderRequest,
    responses(
        (status = 201, description = "Reorder created", body = ApiResponse<OrderDetailResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<ReorderRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetailResponse>>), ServiceError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let order = state.services.orders.reorder(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Status history, oldest first", body = ApiResponse<Vec<OrderStatusHistoryResponse>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrderStatusHistoryResponse>> {
    let history = state.services.orders.status_history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}
