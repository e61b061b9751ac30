use axum::{extract::State, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::pricing::{
        economic::{EconomicQuantityInput, EconomicQuantitySuggestion, ParallelDiscountDetail},
        film::{FilmCostInput, FilmCostResult},
        multi_quantity::MultiQuantityComparison,
        pouch::{SkuCostInput, SkuCostResult},
        unified::{QuoteRequest, QuoteResult},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompareQuantitiesRequest {
    pub base: QuoteRequest,
    pub quantities: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParallelDiscountRequest {
    pub base_price: Decimal,
    pub parallel_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheClearedResponse {
    pub cleared_entries: usize,
}

/// Unified quote for a pouch or roll film specification
#[utoipa::path(
    post,
    path = "/api/v1/quotes/calculate",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quote calculated", body = ApiResponse<QuoteResult>),
        (status = 400, description = "Invalid specification", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn calculate_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<QuoteResult> {
    let quote = state.services.pricing.calculate_quote(&request)?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes/sku-cost",
    request_body = SkuCostInput,
    responses(
        (status = 200, description = "SKU costs calculated", body = ApiResponse<SkuCostResult>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn calculate_sku_cost(
    State(state): State<AppState>,
    Json(input): Json<SkuCostInput>,
) -> ApiResult<SkuCostResult> {
    let result = state.services.pricing.calculate_sku_cost(&input)?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes/film-cost",
    request_body = FilmCostInput,
    responses(
        (status = 200, description = "Film cost calculated", body = ApiResponse<FilmCostResult>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn calculate_film_cost(
    State(state): State<AppState>,
    Json(input): Json<FilmCostInput>,
) -> ApiResult<FilmCostResult> {
    let result = state.services.pricing.calculate_film_cost(&input)?;
    Ok(Json(ApiResponse::success(result)))
}

/// Suggests a quantity that uses whole film rolls
#[utoipa::path(
    post,
    path = "/api/v1/quotes/economic-quantity",
    request_body = EconomicQuantityInput,
    responses(
        (status = 200, description = "Suggestion calculated", body = ApiResponse<EconomicQuantitySuggestion>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn economic_quantity(
    State(state): State<AppState>,
    Json(input): Json<EconomicQuantityInput>,
) -> ApiResult<EconomicQuantitySuggestion> {
    let result = state.services.pricing.calculate_economic_quantity(&input)?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes/compare",
    request_body = CompareQuantitiesRequest,
    responses(
        (status = 200, description = "Quantities compared", body = ApiResponse<MultiQuantityComparison>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn compare_quantities(
    State(state): State<AppState>,
    Json(request): Json<CompareQuantitiesRequest>,
) -> ApiResult<MultiQuantityComparison> {
    let result = state
        .services
        .pricing
        .compare_quantities(&request.base, &request.quantities)?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes/parallel-discount",
    request_body = ParallelDiscountRequest,
    responses(
        (status = 200, description = "Discount calculated", body = ApiResponse<ParallelDiscountDetail>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn parallel_discount(
    State(state): State<AppState>,
    Json(request): Json<ParallelDiscountRequest>,
) -> ApiResult<ParallelDiscountDetail> {
    if request.base_price < Decimal::ZERO {
        return Err(ServiceError::InvalidInput(format!(
            "Base price must not be negative, got: {}",
            request.base_price
        )));
    }
    let result = state
        .services
        .pricing
        .parallel_discount(request.base_price, request.parallel_count)?;
    Ok(Json(ApiResponse::success(result)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quotes/cache",
    responses(
        (status = 200, description = "Quote cache cleared", body = ApiResponse<CacheClearedResponse>)
    ),
    tag = "quotes"
)]
pub async fn clear_cache(State(state): State<AppState>) -> ApiResult<CacheClearedResponse> {
    let cleared_entries = state.services.pricing.cache_size();
    state.services.pricing.clear_cache();
    info!(cleared_entries, "Quote cache cleared");
    Ok(Json(ApiResponse::success(CacheClearedResponse { cleared_entries })))
}
