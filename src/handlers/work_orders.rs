use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::validation_failure,
    services::{
        production_estimator::ProductionEstimate,
        work_orders::{
            AddStageNoteRequest, AdvanceStageRequest, AssignStageRequest, CreateWorkOrderRequest,
            RollbackStageRequest, WorkOrderActionResponse, WorkOrderResponse,
        },
    },
    ApiResponse, ApiResult, AppState,
};

/// Issue the work order for an order; issuing twice returns the existing work order
#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    request_body = CreateWorkOrderRequest,
    responses(
        (status = 201, description = "Work order issued", body = ApiResponse<WorkOrderResponse>),
        (status = 400, description = "Order cannot enter production", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn create_work_order(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrderResponse>>), ServiceError> {
    let work_order = state.services.work_orders.create_work_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(work_order))))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    params(("id" = Uuid, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order with its stages", body = ApiResponse<WorkOrderResponse>),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state.services.work_orders.get_work_order(id).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/work-order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Work order for the order", body = ApiResponse<WorkOrderResponse>),
        (status = 404, description = "No work order issued", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn get_work_order_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state.services.work_orders.get_by_order(order_id).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/advance",
    params(("id" = Uuid, Path, description = "Work order ID")),
    request_body = AdvanceStageRequest,
    responses(
        (status = 200, description = "Stage advanced", body = ApiResponse<WorkOrderResponse>),
        (status = 400, description = "Work order already completed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn advance_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<AdvanceStageRequest>>,
) -> ApiResult<WorkOrderResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let work_order = state.services.work_orders.advance_stage(id, request).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/rollback",
    params(("id" = Uuid, Path, description = "Work order ID")),
    request_body = RollbackStageRequest,
    responses(
        (status = 200, description = "Stage rolled back", body = ApiResponse<WorkOrderResponse>),
        (status = 400, description = "Already at the first stage", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn rollback_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<RollbackStageRequest>>,
) -> ApiResult<WorkOrderResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let work_order = state.services.work_orders.rollback_stage(id, request).await?;
    Ok(Json(ApiResponse::success(work_order)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/stages/{stage}/notes",
    params(
        ("id" = Uuid, Path, description = "Work order ID"),
        ("stage" = String, Path, description = "Production stage, e.g. PRINTING")
    ),
    request_body = AddStageNoteRequest,
    responses(
        (status = 200, description = "Note added", body = ApiResponse<WorkOrderResponse>),
        (status = 400, description = "Unknown stage or empty note", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn add_stage_note(
    State(state): State<AppState>,
    Path((id, stage)): Path<(Uuid, String)>,
    Json(request): Json<AddStageNoteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrderResponse>>), ServiceError> {
    if let Err(errors) = request.validate() {
        return Ok(validation_failure(&errors));
    }
    let work_order = state
        .services
        .work_orders
        .add_note(id, &stage, request)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(work_order))))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/stages/{stage}/assign",
    params(
        ("id" = Uuid, Path, description = "Work order ID"),
        ("stage" = String, Path, description = "Production stage, e.g. PRINTING")
    ),
    request_body = AssignStageRequest,
    responses(
        (status = 200, description = "Stage assigned", body = ApiResponse<WorkOrderResponse>),
        (status = 400, description = "Unknown stage", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn assign_stage(
    State(state): State<AppState>,
    Path((id, stage)): Path<(Uuid, String)>,
    Json(request): Json<AssignStageRequest>,
) -> ApiResult<WorkOrderResponse> {
    let work_order = state
        .services
        .work_orders
        .assign_stage(id, &stage, request)
        .await?;
    Ok(Json(ApiResponse::success(work_order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/history",
    params(("id" = Uuid, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Stage actions, oldest first", body = ApiResponse<Vec<WorkOrderActionResponse>>),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn work_order_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<WorkOrderActionResponse>> {
    let history = state.services.work_orders.history(id).await?;
    Ok(Json(ApiResponse::success(history)))
}

/// Remaining production time on the factory calendar
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/estimate",
    params(("id" = Uuid, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Per-stage estimate and milestone summary", body = ApiResponse<ProductionEstimate>),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn estimate_completion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductionEstimate> {
    let estimate = state.services.work_orders.estimate(id).await?;
    Ok(Json(ApiResponse::success(estimate)))
}
