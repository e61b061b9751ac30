//! The unified quote engine: per-request material, processing, printing and setup costs,
//! minimum price, volume discount, delivery, lead time and optional SKU-based pricing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::economic::{
    calculate_economic_quantity, calculate_parallel_options, EconomicQuantityInput,
    EconomicQuantitySuggestion, ParallelProductionOption,
};
use super::materials::{quote_material, thickness_display_name, FilmLayer, ThicknessSelection};
use super::pouch::{
    calculate_sku_cost, secured_meters, theoretical_meters, PouchDimensions, SkuCostInput,
    SkuCostResult, FIXED_LOSS_METERS,
};
use super::{round_half_up, sum_quantities, CostRates, PricingError};

pub const MIN_ORDER_QUANTITY: u32 = 100;
pub const MAX_ORDER_QUANTITY: u32 = 100_000;
pub const MIN_DIMENSION_MM: Decimal = dec!(10);
pub const MAX_DIMENSION_MM: Decimal = dec!(1000);
pub const MAX_PRINTING_COLORS: u8 = 8;
pub const MINIMUM_PRICE: Decimal = dec!(160000);
pub const CURRENCY: &str = "JPY";

const SMALL_LOT_THRESHOLD: u32 = 3000;
const SMALL_LOT_SURCHARGE: Decimal = dec!(30000);
const UV_PRINTING_FIXED_COST: Decimal = dec!(15000);
const UV_PRINTING_SURCHARGE: Decimal = dec!(20000);
const DEFAULT_THICKNESS_MICRONS: u32 = 80;

/// Bag types accepted by the quote engine.
pub const BAG_TYPES: &[&str] = &[
    "flat_3_side",
    "stand_up",
    "lap_seal",
    "gassho",
    "box",
    "spout_pouch",
    "roll_film",
    "three_side",
    "zipper",
    "zipper_stand",
    "t_shape",
    "m_shape",
    "flat-pouch",
    "standing-pouch",
    "gusset",
    "flat_with_zip",
    "special",
    "soft_pouch",
];

pub fn is_known_bag_type(bag_type: &str) -> bool {
    BAG_TYPES.contains(&bag_type)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrintingMethod {
    #[default]
    Digital,
    Gravure,
}

impl PrintingMethod {
    /// Setup fee, cost per colour per unit and minimum charge.
    fn costs(&self) -> (Decimal, Decimal, Decimal) {
        match self {
            PrintingMethod::Digital => (dec!(10000), dec!(5), dec!(5000)),
            PrintingMethod::Gravure => (dec!(50000), dec!(2), dec!(20000)),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PrintingMethod::Digital => "digital",
            PrintingMethod::Gravure => "gravure",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryLocation {
    #[default]
    Domestic,
    International,
}

impl DeliveryLocation {
    /// Base charge, charge per kg and the free-delivery threshold.
    fn costs(&self) -> (Decimal, Decimal, Decimal) {
        match self {
            DeliveryLocation::Domestic => (dec!(1500), dec!(150), dec!(50000)),
            DeliveryLocation::International => (dec!(5000), dec!(500), dec!(200000)),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            DeliveryLocation::Domestic => "domestic",
            DeliveryLocation::International => "international",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Standard,
    Express,
}

impl Urgency {
    fn as_str(&self) -> &'static str {
        match self {
            Urgency::Standard => "standard",
            Urgency::Express => "express",
        }
    }
}

fn one() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub bag_type_id: String,
    pub material_id: String,
    /// mm
    pub width: Decimal,
    /// mm, ignored for roll film
    #[serde(default)]
    pub height: Decimal,
    #[serde(default)]
    pub depth: Decimal,
    /// Pouches, or metres for roll film. Defaults to the SKU total when omitted.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub sku_quantities: Option<Vec<u32>>,
    #[serde(default)]
    pub use_sku_calculation: bool,
    #[serde(default)]
    pub thickness_selection: Option<String>,
    #[serde(default = "one")]
    pub thickness_multiplier: Decimal,
    #[serde(default)]
    pub is_uv_printing: bool,
    #[serde(default)]
    pub post_processing_options: Vec<String>,
    #[serde(default = "one")]
    pub post_processing_multiplier: Decimal,
    #[serde(default)]
    pub printing_type: PrintingMethod,
    #[serde(default)]
    pub printing_colors: Option<u8>,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub delivery_location: DeliveryLocation,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub markup_rate: Decimal,
    #[serde(default)]
    pub film_layers: Option<Vec<FilmLayer>>,
    #[serde(default)]
    pub material_width: Option<Decimal>,
}

impl QuoteRequest {
    pub fn new(
        bag_type_id: impl Into<String>,
        material_id: impl Into<String>,
        width: Decimal,
        height: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            bag_type_id: bag_type_id.into(),
            material_id: material_id.into(),
            width,
            height,
            depth: Decimal::ZERO,
            quantity,
            sku_quantities: None,
            use_sku_calculation: false,
            thickness_selection: None,
            thickness_multiplier: Decimal::ONE,
            is_uv_printing: false,
            post_processing_options: Vec::new(),
            post_processing_multiplier: Decimal::ONE,
            printing_type: PrintingMethod::Digital,
            printing_colors: None,
            double_sided: false,
            delivery_location: DeliveryLocation::Domestic,
            urgency: Urgency::Standard,
            markup_rate: Decimal::ZERO,
            film_layers: None,
            material_width: None,
        }
    }

    /// `lap_seal` and its alias `gassho` price identically.
    pub fn normalized_bag_type(&self) -> &str {
        match self.bag_type_id.as_str() {
            "gassho" => "lap_seal",
            other => other,
        }
    }

    pub fn is_roll_film(&self) -> bool {
        self.bag_type_id == "roll_film"
    }

    /// Explicit quantity, else the sum of the SKU quantities.
    pub fn effective_quantity(&self) -> u64 {
        match (&self.sku_quantities, self.quantity) {
            (Some(skus), 0) => sum_quantities(skus),
            (_, quantity) => u64::from(quantity),
        }
    }

    /// The effective quantity once it is known to be an orderable lot size.
    pub fn order_quantity(&self) -> Result<u32, PricingError> {
        let quantity = self.effective_quantity();
        u32::try_from(quantity)
            .ok()
            .filter(|q| (MIN_ORDER_QUANTITY..=MAX_ORDER_QUANTITY).contains(q))
            .ok_or(PricingError::InvalidQuantity(quantity))
    }

    pub fn uses_sku_pricing(&self) -> bool {
        match &self.sku_quantities {
            Some(skus) => skus.len() > 1 || (self.use_sku_calculation && !skus.is_empty()),
            None => self.use_sku_calculation,
        }
    }

    fn is_flat(&self) -> bool {
        let bag = self.bag_type_id.to_lowercase();
        bag.contains("flat") || bag.contains("3_side")
    }

    /// Canonical cache key: every pricing input joined with `|`.
    pub fn cache_key(&self) -> String {
        let join_u32 = |values: &[u32]| {
            values
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut options = self.post_processing_options.clone();
        options.sort();
        let layers = self
            .film_layers
            .as_ref()
            .map(|layers| {
                layers
                    .iter()
                    .map(|l| format!("{}:{}", l.material_id, l.thickness))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| "default".to_string());

        [
            self.bag_type_id.clone(),
            self.material_id.clone(),
            self.width.normalize().to_string(),
            self.height.normalize().to_string(),
            self.depth.normalize().to_string(),
            self.effective_quantity().to_string(),
            self.sku_quantities
                .as_deref()
                .map(join_u32)
                .unwrap_or_else(|| "-".to_string()),
            self.use_sku_calculation.to_string(),
            self.thickness_selection
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            self.thickness_multiplier.normalize().to_string(),
            self.is_uv_printing.to_string(),
            options.join(","),
            self.post_processing_multiplier.normalize().to_string(),
            self.printing_type.as_str().to_string(),
            self.printing_colors.unwrap_or(1).to_string(),
            self.double_sided.to_string(),
            self.delivery_location.as_str().to_string(),
            self.urgency.as_str().to_string(),
            self.markup_rate.normalize().to_string(),
            layers,
            self.material_width
                .map(|w| w.normalize().to_string())
                .unwrap_or_else(|| "auto".to_string()),
        ]
        .join("|")
    }
}

/// Rounded JPY amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteBreakdown {
    pub material: Decimal,
    pub processing: Decimal,
    pub printing: Decimal,
    pub setup: Decimal,
    pub discount: Decimal,
    pub delivery: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteDetails {
    pub fixed_cost: Decimal,
    pub variable_cost_per_unit: Decimal,
    pub surcharge: Decimal,
    pub material_rate: Decimal,
    /// mm²
    pub area: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteResult {
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub quantity: u32,
    pub breakdown: QuoteBreakdown,
    pub lead_time_days: u32,
    pub valid_until: DateTime<Utc>,
    pub min_order_quantity: u32,
    pub minimum_price_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<QuoteDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness_multiplier: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_thickness_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_processing_multiplier: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_production_options: Option<Vec<ParallelProductionOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_breakdown: Option<SkuCostResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub economic_quantity: Option<EconomicQuantitySuggestion>,
}

pub fn validate_request(request: &QuoteRequest) -> Result<(), PricingError> {
    request.order_quantity()?;
    if !is_known_bag_type(&request.bag_type_id) {
        return Err(PricingError::UnknownBagType(request.bag_type_id.clone()));
    }
    if request.width < MIN_DIMENSION_MM || request.width > MAX_DIMENSION_MM {
        return Err(PricingError::InvalidDimension {
            field: "width",
            value: request.width,
        });
    }
    if !request.is_roll_film()
        && (request.height < MIN_DIMENSION_MM || request.height > MAX_DIMENSION_MM)
    {
        return Err(PricingError::InvalidDimension {
            field: "height",
            value: request.height,
        });
    }
    if request.depth < Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "depth",
            value: request.depth,
        });
    }
    if let Some(colors) = request.printing_colors {
        if colors == 0 || colors > MAX_PRINTING_COLORS {
            return Err(PricingError::InvalidPrintingColors(colors));
        }
    }
    if request.markup_rate < Decimal::ZERO {
        return Err(PricingError::InvalidInput(
            "Markup rate cannot be negative".to_string(),
        ));
    }
    if request.thickness_multiplier <= Decimal::ZERO
        || request.post_processing_multiplier <= Decimal::ZERO
    {
        return Err(PricingError::InvalidInput(
            "Multipliers must be positive".to_string(),
        ));
    }
    Ok(())
}

fn height(request: &QuoteRequest) -> Decimal {
    if request.is_roll_film() {
        Decimal::ZERO
    } else {
        request.height
    }
}

fn material_cost(request: &QuoteRequest) -> Decimal {
    let material = quote_material(&request.material_id);
    let microns = request
        .thickness_selection
        .as_deref()
        .map(|s| ThicknessSelection::parse_or_default(Some(s)).microns())
        .unwrap_or(DEFAULT_THICKNESS_MICRONS);
    let area_m2 = request.width * height(request) / dec!(1000000);
    let weight_kg = area_m2 * Decimal::from(microns) / dec!(1000000) * material.density_rate;
    weight_kg * material.cost_per_kg * request.thickness_multiplier
}

fn processing_cost(request: &QuoteRequest, quantity: u32) -> Decimal {
    let base = match request.normalized_bag_type() {
        "flat-pouch" | "flat_3_side" => dec!(15),
        "standing-pouch" | "stand_up" => dec!(18),
        "gusset" | "flat_with_zip" => dec!(20),
        "box" => dec!(22),
        "special" => dec!(25),
        "soft_pouch" => dec!(17),
        _ => dec!(15),
    };
    if request.is_uv_printing {
        base * dec!(1.1)
    } else {
        base * Decimal::from(quantity)
    }
}

fn printing_cost(request: &QuoteRequest, quantity: u32) -> Decimal {
    if request.is_uv_printing {
        return UV_PRINTING_FIXED_COST;
    }
    let (setup, per_color, min_charge) = request.printing_type.costs();
    let sides = if request.double_sided { 2 } else { 1 };
    let colors = Decimal::from(request.printing_colors.unwrap_or(1));
    let total = setup + colors * Decimal::from(sides) * per_color * Decimal::from(quantity);
    total.max(min_charge)
}

fn setup_cost(request: &QuoteRequest, quantity: u32) -> Decimal {
    if request.is_uv_printing {
        return UV_PRINTING_FIXED_COST;
    }
    let base = if request.is_flat() {
        dec!(30000)
    } else {
        dec!(40000)
    };
    if quantity < SMALL_LOT_THRESHOLD {
        base * dec!(1.2)
    } else {
        base
    }
}

fn small_lot_surcharge(request: &QuoteRequest, quantity: u32) -> Decimal {
    if quantity >= SMALL_LOT_THRESHOLD {
        return Decimal::ZERO;
    }
    if request.is_uv_printing {
        UV_PRINTING_SURCHARGE
    } else if request.is_flat() {
        SMALL_LOT_SURCHARGE
    } else {
        Decimal::ZERO
    }
}

/// 15% from 10,000 units, 10% from 5,000, 5% from 3,000.
pub fn volume_discount_rate(quantity: u32) -> Decimal {
    match quantity {
        q if q >= 10_000 => dec!(0.15),
        q if q >= 5_000 => dec!(0.10),
        q if q >= 3_000 => dec!(0.05),
        _ => Decimal::ZERO,
    }
}

fn delivery_cost(request: &QuoteRequest) -> Decimal {
    let (base, per_kg, free_threshold) = request.delivery_location.costs();
    let material = quote_material(&request.material_id);
    let weight_kg = request.width * height(request) / dec!(1000000)
        * Decimal::from(DEFAULT_THICKNESS_MICRONS)
        / dec!(1000000)
        * material.density_rate;
    let cost = base + weight_kg * per_kg;
    if cost < free_threshold {
        cost
    } else {
        Decimal::ZERO
    }
}

pub fn lead_time_days(request: &QuoteRequest, quantity: u32) -> u32 {
    let mut days: u32 = match request.urgency {
        Urgency::Express => 7,
        Urgency::Standard => 14,
    };
    if request.is_uv_printing {
        days = days.saturating_sub(3).max(5);
    }
    if quantity >= 10_000 {
        days += 7;
    } else if quantity >= 5_000 {
        days += 3;
    }
    if request.post_processing_multiplier > Decimal::ONE {
        days += 2;
    }
    days
}

fn apply_markup(total: Decimal, markup_rate: Decimal) -> Decimal {
    if markup_rate > Decimal::ZERO {
        total * (Decimal::ONE + markup_rate)
    } else {
        total
    }
}

fn dimensions(request: &QuoteRequest) -> PouchDimensions {
    PouchDimensions::new(request.width, height(request), request.depth)
}

/// Film metres consumed by a single-SKU order: roll film is ordered in metres.
fn film_usage(request: &QuoteRequest, quantity: u32) -> Decimal {
    if request.is_roll_film() {
        return Decimal::from(quantity);
    }
    let theoretical = theoretical_meters(quantity, &request.bag_type_id, &dimensions(request), 1);
    secured_meters(theoretical, 1) + FIXED_LOSS_METERS
}

pub fn calculate_quote(
    request: &QuoteRequest,
    rates: &CostRates,
    valid_until: DateTime<Utc>,
) -> Result<QuoteResult, PricingError> {
    validate_request(request)?;
    if request.uses_sku_pricing() {
        return calculate_sku_quote(request, rates, valid_until);
    }

    let quantity = request.order_quantity()?;
    let qty = Decimal::from(quantity);

    let material = material_cost(request);
    let processing = processing_cost(request, quantity);
    let printing = printing_cost(request, quantity);
    let setup = setup_cost(request, quantity);
    let surcharge = small_lot_surcharge(request, quantity);

    let subtotal = material + processing + printing + setup + surcharge;
    let adjusted = subtotal * request.post_processing_multiplier;
    let min_adjusted = adjusted.max(MINIMUM_PRICE);
    let discount = min_adjusted * volume_discount_rate(quantity);
    let delivery = delivery_cost(request);
    let before_floor = min_adjusted - discount + delivery;
    let base_total = before_floor.max(MINIMUM_PRICE);
    let total = apply_markup(base_total, request.markup_rate);

    let parallel_production_options = calculate_parallel_options(
        &dimensions(request),
        &request.bag_type_id,
        film_usage(request, quantity),
        total / qty,
        request.film_layers.as_deref(),
        rates,
    )?;

    Ok(QuoteResult {
        unit_price: round_half_up(total / qty),
        total_price: round_half_up(total),
        currency: CURRENCY.to_string(),
        quantity,
        breakdown: QuoteBreakdown {
            material: round_half_up(material),
            processing: round_half_up(processing),
            printing: round_half_up(printing),
            setup: round_half_up(setup),
            discount: round_half_up(discount),
            delivery: round_half_up(delivery),
            subtotal: round_half_up(subtotal),
            total: round_half_up(total),
        },
        lead_time_days: lead_time_days(request, quantity),
        valid_until,
        min_order_quantity: MIN_ORDER_QUANTITY,
        minimum_price_applied: adjusted < MINIMUM_PRICE || before_floor < MINIMUM_PRICE,
        details: Some(QuoteDetails {
            fixed_cost: setup,
            variable_cost_per_unit: (material + processing + printing) / qty,
            surcharge,
            material_rate: quote_material(&request.material_id).density_rate,
            area: request.width * height(request),
        }),
        thickness_multiplier: (request.thickness_multiplier != Decimal::ONE)
            .then_some(request.thickness_multiplier),
        selected_thickness_name: selected_thickness_name(request),
        post_processing_multiplier: (request.post_processing_multiplier != Decimal::ONE)
            .then_some(request.post_processing_multiplier),
        markup_rate: (request.markup_rate > Decimal::ZERO).then_some(request.markup_rate),
        parallel_production_options,
        sku_breakdown: None,
        economic_quantity: None,
    })
}

fn selected_thickness_name(request: &QuoteRequest) -> Option<String> {
    let selection = request.thickness_selection.as_deref()?;
    thickness_display_name(&request.material_id, selection).map(str::to_string)
}

fn calculate_sku_quote(
    request: &QuoteRequest,
    rates: &CostRates,
    valid_until: DateTime<Utc>,
) -> Result<QuoteResult, PricingError> {
    let sku_quantities = match &request.sku_quantities {
        Some(skus) => skus.clone(),
        None => vec![request.order_quantity()?],
    };
    let sku = calculate_sku_cost(
        &SkuCostInput {
            sku_quantities,
            dimensions: dimensions(request),
            pouch_type: request.normalized_bag_type().to_string(),
            material_id: Some(request.material_id.clone()),
            thickness_selection: request.thickness_selection.clone(),
            film_layers: request.film_layers.clone(),
            post_processing_options: request.post_processing_options.clone(),
            material_width: request.material_width,
        },
        rates,
    )?;

    let quantity = sku.total_quantity;
    let qty = Decimal::from(quantity);
    let total = apply_markup(sku.total_cost_jpy, request.markup_rate);
    let unit_price = round_half_up(total / qty);

    let sum = |f: fn(&super::pouch::SkuCostBreakdown) -> Decimal| -> Decimal {
        sku.cost_per_sku.iter().map(|s| f(&s.cost_breakdown)).sum()
    };
    let material = sum(|b| b.material_cost + b.lamination_cost + b.slitter_cost);
    let processing = sum(|b| b.pouch_processing_cost);
    let printing = sum(|b| b.printing_cost);
    let delivery = sum(|b| b.delivery);

    let economic = calculate_economic_quantity(
        &EconomicQuantityInput {
            order_quantity: quantity,
            dimensions: dimensions(request),
            pouch_type: request.normalized_bag_type().to_string(),
            current_film_usage: sku.summary.total_with_loss_meters,
            current_unit_price: total / qty,
            film_layers: request.film_layers.clone(),
        },
        rates,
    )?;

    Ok(QuoteResult {
        unit_price,
        total_price: round_half_up(total),
        currency: CURRENCY.to_string(),
        quantity,
        breakdown: QuoteBreakdown {
            material,
            processing,
            printing,
            setup: Decimal::ZERO,
            discount: Decimal::ZERO,
            delivery,
            subtotal: round_half_up(total - delivery),
            total: round_half_up(total),
        },
        lead_time_days: lead_time_days(request, quantity),
        valid_until,
        min_order_quantity: MIN_ORDER_QUANTITY,
        minimum_price_applied: false,
        details: None,
        thickness_multiplier: None,
        selected_thickness_name: selected_thickness_name(request),
        post_processing_multiplier: None,
        markup_rate: (request.markup_rate > Decimal::ZERO).then_some(request.markup_rate),
        parallel_production_options: economic.parallel_production_options.clone(),
        sku_breakdown: Some(sku),
        economic_quantity: Some(economic),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use rstest::rstest;

    fn quote(request: &QuoteRequest) -> QuoteResult {
        calculate_quote(request, &CostRates::default(), Utc::now() + Duration::days(30)).unwrap()
    }

    fn flat(quantity: u32) -> QuoteRequest {
        QuoteRequest::new("flat_3_side", "PET", dec!(100), dec!(150), quantity)
    }

    #[test]
    fn small_flat_order_hits_minimum_price() {
        let result = quote(&flat(1000));
        // setup 36000 + surcharge 30000 + processing 15000 + printing 15000 < 160000
        assert_eq!(result.breakdown.setup, dec!(36000));
        assert_eq!(result.breakdown.processing, dec!(15000));
        assert_eq!(result.breakdown.printing, dec!(15000));
        assert_eq!(result.details.as_ref().unwrap().surcharge, dec!(30000));
        assert_eq!(result.breakdown.discount, Decimal::ZERO);
        assert!(result.minimum_price_applied);
        // 160000 + 1500 delivery and a negligible weight charge
        assert_eq!(result.total_price, dec!(161500));
        assert_eq!(result.unit_price, dec!(162));
        assert_eq!(result.currency, "JPY");
        assert_eq!(result.min_order_quantity, 100);
        assert_eq!(result.lead_time_days, 14);
    }

    #[test]
    fn large_gravure_order_gets_volume_discount() {
        let mut request = QuoteRequest::new("stand_up", "kraft-pe", dec!(130), dec!(200), 20000);
        request.printing_type = PrintingMethod::Gravure;
        request.printing_colors = Some(4);
        let result = quote(&request);

        // processing 18 × 20000, printing 50000 + 4 × 2 × 20000, setup 40000
        assert_eq!(result.breakdown.processing, dec!(360000));
        assert_eq!(result.breakdown.printing, dec!(210000));
        assert_eq!(result.breakdown.setup, dec!(40000));
        let subtotal = result.breakdown.subtotal;
        assert_eq!(result.breakdown.discount, round_half_up(subtotal * dec!(0.15)));
        assert!(!result.minimum_price_applied);
        assert_eq!(result.lead_time_days, 21);
    }

    #[test]
    fn uv_printing_uses_fixed_costs() {
        let mut request = flat(500);
        request.is_uv_printing = true;
        let result = quote(&request);
        assert_eq!(result.breakdown.printing, dec!(15000));
        assert_eq!(result.breakdown.setup, dec!(15000));
        // 15 × 1.1
        assert_eq!(result.breakdown.processing, dec!(17));
        assert_eq!(result.details.unwrap().surcharge, dec!(20000));
        assert_eq!(result.lead_time_days, 11);
    }

    #[test]
    fn markup_scales_total() {
        let base = quote(&flat(1000));
        let mut request = flat(1000);
        request.markup_rate = dec!(0.2);
        let marked = quote(&request);
        assert_eq!(marked.total_price, round_half_up(base.total_price * dec!(1.2)));
        assert_eq!(marked.markup_rate, Some(dec!(0.2)));
    }

    #[rstest]
    #[case(Urgency::Standard, 4000, dec!(1), 14)]
    #[case(Urgency::Express, 4000, dec!(1), 7)]
    #[case(Urgency::Standard, 5000, dec!(1), 17)]
    #[case(Urgency::Express, 12000, dec!(1.2), 16)]
    fn lead_times(
        #[case] urgency: Urgency,
        #[case] quantity: u32,
        #[case] post_multiplier: Decimal,
        #[case] expected: u32,
    ) {
        let mut request = flat(quantity);
        request.urgency = urgency;
        request.post_processing_multiplier = post_multiplier;
        assert_eq!(lead_time_days(&request, quantity), expected);
    }

    #[test]
    fn roll_film_ignores_height() {
        let mut request = QuoteRequest::new("roll_film", "PET", dec!(200), Decimal::ZERO, 500);
        request.height = dec!(5000);
        let result = quote(&request);
        assert_eq!(result.breakdown.material, Decimal::ZERO);
        assert_eq!(result.details.unwrap().area, Decimal::ZERO);
        assert!(result.parallel_production_options.is_some());
    }

    #[test]
    fn thickness_and_multiplier_metadata() {
        let mut request = QuoteRequest::new("stand_up", "opp-alu-foil", dec!(130), dec!(200), 3000);
        request.thickness_selection = Some("heavy".into());
        request.thickness_multiplier = dec!(1.1);
        request.post_processing_multiplier = dec!(1.3);
        let result = quote(&request);
        assert_eq!(result.selected_thickness_name.as_deref(), Some("高耐久タイプ (~800g)"));
        assert_eq!(result.thickness_multiplier, Some(dec!(1.1)));
        assert_eq!(result.post_processing_multiplier, Some(dec!(1.3)));
    }

    #[test]
    fn sku_mode_prices_through_sku_calculator() {
        let mut request = QuoteRequest::new("stand_up", "PET", dec!(130), dec!(200), 0);
        request.sku_quantities = Some(vec![500, 700]);
        let result = quote(&request);
        let sku = result.sku_breakdown.as_ref().unwrap();
        assert_eq!(result.quantity, 1200);
        assert_eq!(sku.cost_per_sku.len(), 2);
        assert_eq!(result.total_price, round_half_up(sku.total_cost_jpy));
        assert!(result.economic_quantity.is_some());
    }

    #[test]
    fn cache_key_distinguishes_inputs() {
        let a = flat(1000);
        let mut b = flat(1000);
        assert_eq!(a.cache_key(), b.cache_key());
        b.double_sided = true;
        assert_ne!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().starts_with("flat_3_side|PET|100|150|0|1000|"));
    }

    #[test]
    fn oversized_sku_totals_are_rejected_not_wrapped() {
        let rates = CostRates::default();
        let mut request = flat(0);
        request.sku_quantities = Some(vec![u32::MAX, 1001]);
        assert_eq!(request.effective_quantity(), u64::from(u32::MAX) + 1001);
        assert_matches!(
            calculate_quote(&request, &rates, Utc::now()),
            Err(PricingError::InvalidQuantity(q)) if q == u64::from(u32::MAX) + 1001
        );

        request.sku_quantities = Some(vec![50_000, 50_001]);
        assert_matches!(
            calculate_quote(&request, &rates, Utc::now()),
            Err(PricingError::InvalidQuantity(100_001))
        );

        request.sku_quantities = Some(vec![50_000, 50_000]);
        let quote = calculate_quote(&request, &rates, Utc::now()).unwrap();
        assert_eq!(quote.quantity, 100_000);
    }

    #[test]
    fn gassho_is_lap_seal() {
        let request = QuoteRequest::new("gassho", "PET", dec!(100), dec!(150), 1000);
        assert_eq!(request.normalized_bag_type(), "lap_seal");
        assert!(calculate_quote(&request, &CostRates::default(), Utc::now()).is_ok());
    }

    #[test]
    fn validation_errors() {
        let rates = CostRates::default();
        let now = Utc::now();
        assert_matches!(
            calculate_quote(&flat(99), &rates, now),
            Err(PricingError::InvalidQuantity(99))
        );
        assert_matches!(
            calculate_quote(&flat(100_001), &rates, now),
            Err(PricingError::InvalidQuantity(100_001))
        );
        let mut request = flat(1000);
        request.width = dec!(5);
        assert_matches!(
            calculate_quote(&request, &rates, now),
            Err(PricingError::InvalidDimension { field: "width", .. })
        );
        let mut request = flat(1000);
        request.bag_type_id = "envelope".into();
        assert_matches!(
            calculate_quote(&request, &rates, now),
            Err(PricingError::UnknownBagType(_))
        );
        let mut request = flat(1000);
        request.printing_colors = Some(9);
        assert_matches!(
            calculate_quote(&request, &rates, now),
            Err(PricingError::InvalidPrintingColors(9))
        );
    }
}
