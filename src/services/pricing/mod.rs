//! Pricing engine for pouches and film.
//!
//! The calculators in the submodules are pure functions over `Decimal`; `PricingService`
//! wires them to configuration, the quote cache and metrics.

pub mod economic;
pub mod film;
pub mod materials;
pub mod multi_quantity;
pub mod pouch;
pub mod unified;

use chrono::{Duration, Utc};
use metrics::{counter, histogram};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cache::QuoteCache;
use crate::config::PricingConfig;

use economic::{EconomicQuantityInput, EconomicQuantitySuggestion, ParallelDiscountDetail};
use film::{FilmCostInput, FilmCostResult};
use multi_quantity::MultiQuantityComparison;
use pouch::{SkuCostInput, SkuCostResult};
use unified::{QuoteRequest, QuoteResult};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("Quantity {0} is outside the accepted range")]
    InvalidQuantity(u64),
    #[error("Invalid {field}: {value}")]
    InvalidDimension { field: &'static str, value: Decimal },
    #[error("Unknown bag type: {0}")]
    UnknownBagType(String),
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),
    #[error("Printing colors must be between 1 and 8, got {0}")]
    InvalidPrintingColors(u8),
    #[error("{0}")]
    InvalidInput(String),
}

/// Total of per-SKU quantities, widened to `u64` so oversized inputs cannot wrap.
pub fn sum_quantities(quantities: &[u32]) -> u64 {
    quantities
        .iter()
        .fold(0u64, |total, &q| total.saturating_add(u64::from(q)))
}

/// Currency conversion and duty applied to supplier costs quoted in KRW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRates {
    /// JPY per KRW
    pub exchange_rate: Decimal,
    pub duty_rate: Decimal,
}

impl Default for CostRates {
    fn default() -> Self {
        Self::from(&PricingConfig::default())
    }
}

impl From<&PricingConfig> for CostRates {
    fn from(config: &PricingConfig) -> Self {
        Self {
            exchange_rate: config.exchange_rate_krw_jpy,
            duty_rate: config.duty_rate,
        }
    }
}

/// Rounds half away from zero to an integer.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds half away from zero to `dp` decimal places.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Saturating conversion of a non-negative integral decimal.
pub(crate) fn decimal_to_u32(value: Decimal) -> u32 {
    if value <= Decimal::ZERO {
        0
    } else {
        value.trunc().to_u32().unwrap_or(u32::MAX)
    }
}

/// Quote engine facade holding the rates and the shared result cache.
#[derive(Clone)]
pub struct PricingService {
    config: Arc<PricingConfig>,
    cache: QuoteCache<QuoteResult>,
}

impl PricingService {
    pub fn new(config: PricingConfig) -> Self {
        let cache = QuoteCache::new(config.quote_cache_capacity, config.quote_cache_ttl());
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn rates(&self) -> CostRates {
        CostRates::from(self.config.as_ref())
    }

    /// Prices a request, serving repeated identical requests from the cache.
    #[instrument(skip(self, request), fields(bag_type = %request.bag_type_id, quantity = request.effective_quantity()))]
    pub fn calculate_quote(&self, request: &QuoteRequest) -> Result<QuoteResult, PricingError> {
        let key = request.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            counter!("pricing.quote_cache.hits", 1);
            debug!("quote served from cache");
            return Ok(cached);
        }
        counter!("pricing.quote_cache.misses", 1);

        let started = Instant::now();
        let valid_until = Utc::now() + Duration::days(self.config.quote_validity_days);
        let result = unified::calculate_quote(request, &self.rates(), valid_until)?;
        histogram!(
            "pricing.quote.duration_seconds",
            started.elapsed().as_secs_f64()
        );
        counter!("pricing.quotes.calculated", 1);

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    #[instrument(skip(self, input), fields(skus = input.sku_quantities.len()))]
    pub fn calculate_sku_cost(&self, input: &SkuCostInput) -> Result<SkuCostResult, PricingError> {
        counter!("pricing.sku_costs.calculated", 1);
        pouch::calculate_sku_cost(input, &self.rates())
    }

    #[instrument(skip(self, input), fields(layers = input.layers.len()))]
    pub fn calculate_film_cost(&self, input: &FilmCostInput) -> Result<FilmCostResult, PricingError> {
        counter!("pricing.film_costs.calculated", 1);
        film::calculate_film_cost(input, &self.rates())
    }

    #[instrument(skip(self, input), fields(order_quantity = input.order_quantity))]
    pub fn calculate_economic_quantity(
        &self,
        input: &EconomicQuantityInput,
    ) -> Result<EconomicQuantitySuggestion, PricingError> {
        economic::calculate_economic_quantity(input, &self.rates())
    }

    /// Prices the same specification at each quantity, going through the cache.
    #[instrument(skip(self, base, quantities), fields(count = quantities.len()))]
    pub fn compare_quantities(
        &self,
        base: &QuoteRequest,
        quantities: &[u32],
    ) -> Result<MultiQuantityComparison, PricingError> {
        multi_quantity::compare_quantities(base, quantities, |request| {
            self.calculate_quote(request)
        })
    }

    pub fn parallel_discount(
        &self,
        base: Decimal,
        count: u32,
    ) -> Result<ParallelDiscountDetail, PricingError> {
        economic::parallel_discount_detail(base, count)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("quote cache cleared");
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
