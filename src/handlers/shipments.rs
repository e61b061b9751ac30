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
    services::shipments::{
        BatchStatusRequest, BatchStatusResponse, CreateShipmentRequest, ShipmentDetailResponse,
        ShipmentFilter, ShipmentResponse, TrackingUpdateRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

/// Largest batch accepted by the batch status endpoint.
const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub order_id: Option<Uuid>,
    pub status: Option<String>,
    pub carrier: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment registered", body = ApiResponse<ShipmentDetailResponse>),
        (status = 400, description = "Invalid carrier, tracking number or order status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Tracking number already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(request): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShipmentDetailResponse>>), ServiceError> {
    if let Err(errors) = request.validate() {
        return Ok(validation_failure(&errors));
    }
    let shipment = state.services.shipments.create_shipment(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(shipment))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<ShipmentResponse>> {
    let (page, limit) = page_and_limit(&state, query.page, query.limit);
    let filter = ShipmentFilter {
        order_id: query.order_id,
        status: query.status,
        carrier: query.carrier,
    };
    let (items, total) = state
        .services
        .shipments
        .list_shipments(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment with tracking events", body = ApiResponse<ShipmentDetailResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentDetailResponse> {
    let shipment = state.services.shipments.get_shipment(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/track/{tracking_number}",
    params(("tracking_number" = String, Path, description = "Tracking number, separators allowed")),
    responses(
        (status = 200, description = "Shipment with tracking events", body = ApiResponse<ShipmentDetailResponse>),
        (status = 404, description = "Unknown tracking number", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn track_shipment(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> ApiResult<ShipmentDetailResponse> {
    let shipment = state.services.shipments.track(&tracking_number).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

/// Record a tracking event; unknown carrier statuses are treated as PENDING
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/tracking",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = TrackingUpdateRequest,
    responses(
        (status = 200, description = "Tracking recorded", body = ApiResponse<ShipmentDetailResponse>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn record_tracking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TrackingUpdateRequest>,
) -> ApiResult<ShipmentDetailResponse> {
    let shipment = state.services.shipments.record_tracking(id, request).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/batch-status",
    request_body = BatchStatusRequest,
    responses(
        (status = 200, description = "Per-shipment outcomes", body = ApiResponse<BatchStatusResponse>),
        (status = 400, description = "Empty or oversized batch", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn batch_update_status(
    State(state): State<AppState>,
    Json(request): Json<BatchStatusRequest>,
) -> ApiResult<BatchStatusResponse> {
    if request.updates.is_empty() || request.updates.len() > MAX_BATCH_SIZE {
        return Err(ServiceError::InvalidInput(format!(
            "A batch must contain between 1 and {} updates",
            MAX_BATCH_SIZE
        )));
    }
    let response = state.services.shipments.batch_update_status(request).await;
    Ok(Json(ApiResponse::success(response)))
}
