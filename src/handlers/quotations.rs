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
    services::quotations::{
        ConversionResponse, ConvertQuotationRequest, CreateQuotationRequest,
        QuotationDetailResponse, QuotationFilter, QuotationResponse, UpdateQuotationStatusRequest,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuotationListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
    pub customer_email: Option<String>,
}

/// Create a quotation; items without a unit price are priced from their specification
#[utoipa::path(
    post,
    path = "/api/v1/quotations",
    request_body = CreateQuotationRequest,
    responses(
        (status = 201, description = "Quotation created", body = ApiResponse<QuotationDetailResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn create_quotation(
    State(state): State<AppState>,
    Json(request): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QuotationDetailResponse>>), ServiceError> {
    if let Err(errors) = request.validate() {
        return Ok(validation_failure(&errors));
    }
    let quotation = state.services.quotations.create_quotation(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(quotation))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotations",
    params(QuotationListQuery),
    responses(
        (status = 200, description = "Quotations listed", body = ApiResponse<PaginatedResponse<QuotationResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn list_quotations(
    State(state): State<AppState>,
    Query(query): Query<QuotationListQuery>,
) -> ApiResult<PaginatedResponse<QuotationResponse>> {
    let (page, limit) = page_and_limit(&state, query.page, query.limit);
    let filter = QuotationFilter {
        status: query.status,
        customer_email: query.customer_email,
    };
    let (items, total) = state
        .services
        .quotations
        .list_quotations(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginated(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotations/{id}",
    params(("id" = Uuid, Path, description = "Quotation ID")),
    responses(
        (status = 200, description = "Quotation found", body = ApiResponse<QuotationDetailResponse>),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuotationDetailResponse> {
    let quotation = state.services.quotations.get_quotation(id).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

#[utoipa::path(
    put,
    path = "/api/v1/quotations/{id}/status",
    params(("id" = Uuid, Path, description = "Quotation ID")),
    request_body = UpdateQuotationStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<QuotationResponse>),
        (status = 400, description = "Invalid status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn update_quotation_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuotationStatusRequest>,
) -> ApiResult<QuotationResponse> {
    let quotation = state.services.quotations.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(quotation)))
}

/// Convert an approved quotation into an order; repeated calls return the same order
#[utoipa::path(
    post,
    path = "/api/v1/quotations/{id}/convert",
    params(("id" = Uuid, Path, description = "Quotation ID")),
    request_body = ConvertQuotationRequest,
    responses(
        (status = 201, description = "Order created from quotation", body = ApiResponse<ConversionResponse>),
        (status = 200, description = "Quotation was already converted", body = ApiResponse<ConversionResponse>),
        (status = 400, description = "Quotation cannot be converted", body = crate::errors::ErrorResponse),
        (status = 404, description = "Quotation not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotations"
)]
pub async fn convert_quotation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<ConvertQuotationRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ConversionResponse>>), ServiceError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let conversion = state
        .services
        .quotations
        .convert_to_order(id, request)
        .await?;
    let status = if conversion.already_converted {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::success(conversion))))
}
