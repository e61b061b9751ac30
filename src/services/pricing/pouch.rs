//! SKU-based pouch costing: film width and column layout, secured metres per SKU,
//! fixed 400 m loss shared across SKUs, bag-making charges and the margin chain.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::film::{calculate_film_cost, FilmCostInput, FilmCostResult, FilmPrintingType};
use super::materials::{adjust_layers_for_thickness, default_layers, FilmLayer, ThicknessSelection};
use super::unified::MAX_ORDER_QUANTITY;
use super::{round_dp, round_half_up, sum_quantities, CostRates, PricingError};

pub const FIXED_LOSS_METERS: Decimal = dec!(400);
/// Widest film that fits the 760 mm roll.
pub const MAX_FILM_WIDTH_MM: Decimal = dec!(740);
const NARROW_ROLL_MAX_FILM_WIDTH_MM: Decimal = dec!(570);
const MANUFACTURER_MARGIN: Decimal = dec!(1.4);
const SALES_MARGIN: Decimal = dec!(1.2);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PouchDimensions {
    /// Pitch along the film in mm
    pub width: Decimal,
    pub height: Decimal,
    /// Gusset in mm
    #[serde(default)]
    pub depth: Decimal,
}

impl PouchDimensions {
    pub fn new(width: Decimal, height: Decimal, depth: Decimal) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuCostInput {
    /// Quantity per SKU design
    pub sku_quantities: Vec<u32>,
    pub dimensions: PouchDimensions,
    pub pouch_type: String,
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub thickness_selection: Option<String>,
    #[serde(default)]
    pub film_layers: Option<Vec<FilmLayer>>,
    #[serde(default)]
    pub post_processing_options: Vec<String>,
    /// Overrides the automatic 590/760 mm roll choice
    #[serde(default)]
    pub material_width: Option<Decimal>,
}

/// JPY amounts, each rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuCostBreakdown {
    pub material_cost: Decimal,
    pub printing_cost: Decimal,
    pub lamination_cost: Decimal,
    pub slitter_cost: Decimal,
    pub pouch_processing_cost: Decimal,
    pub manufacturing_margin: Decimal,
    pub duty: Decimal,
    pub delivery: Decimal,
    pub sales_margin: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuCost {
    pub sku_index: usize,
    pub quantity: u32,
    pub theoretical_meters: Decimal,
    pub secured_meters: Decimal,
    pub loss_meters: Decimal,
    pub total_meters: Decimal,
    pub cost_jpy: Decimal,
    pub unit_cost_jpy: Decimal,
    pub delivery_boxes: u32,
    pub cost_breakdown: SkuCostBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuCostSummary {
    pub total_secured_meters: Decimal,
    pub loss_meters: Decimal,
    pub total_with_loss_meters: Decimal,
    pub total_weight: Decimal,
    pub delivery_boxes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuCostResult {
    pub total_cost_jpy: Decimal,
    pub total_quantity: u32,
    pub unit_cost_jpy: Decimal,
    pub cost_per_sku: Vec<SkuCost>,
    pub summary: SkuCostSummary,
    pub column_count: u32,
    pub calculated_film_width: Decimal,
    pub material_width: Decimal,
}

/// Printed film width for a pouch shape laid out in `columns` columns.
pub fn film_width(pouch_type: &str, dims: &PouchDimensions, columns: u32) -> Decimal {
    let (w, h, g) = (dims.width, dims.height, dims.depth);
    let single = columns <= 1;
    match pouch_type {
        "stand_up" | "zipper_stand" if single => dec!(2) * h + g + dec!(35),
        "stand_up" | "zipper_stand" => dec!(4) * h + dec!(2) * g + dec!(40),
        "t_shape" => dec!(2) * w + dec!(22),
        "m_shape" | "box" => (g + w) * dec!(2) + dec!(32),
        _ if single => dec!(2) * h + dec!(41),
        _ => dec!(4) * h + dec!(71),
    }
}

/// Two columns whenever the two-column film still fits the widest roll.
pub fn column_count(pouch_type: &str, dims: &PouchDimensions) -> u32 {
    if film_width(pouch_type, dims, 2) <= MAX_FILM_WIDTH_MM {
        2
    } else {
        1
    }
}

/// Raw roll width: 590 mm when the film fits in 570 mm, 760 mm otherwise.
pub fn material_width_for(film_width: Decimal) -> Decimal {
    if film_width <= NARROW_ROLL_MAX_FILM_WIDTH_MM {
        dec!(590)
    } else {
        dec!(760)
    }
}

fn pitch(pouch_type: &str, dims: &PouchDimensions) -> Decimal {
    if pouch_type.contains("m_shape") || pouch_type.contains("box") {
        dims.depth + dims.width
    } else {
        dims.width
    }
}

/// Metres of film needed for `quantity` pouches without any minimum or loss.
pub fn theoretical_meters(
    quantity: u32,
    pouch_type: &str,
    dims: &PouchDimensions,
    columns: u32,
) -> Decimal {
    Decimal::from(quantity) * pitch(pouch_type, dims) / (dec!(1000) * Decimal::from(columns.max(1)))
}

/// 500 m per SKU for single-SKU orders, 300 m otherwise; above that round up to 50 m.
pub fn secured_meters(theoretical: Decimal, sku_count: usize) -> Decimal {
    let minimum = if sku_count == 1 { dec!(500) } else { dec!(300) };
    if theoretical <= minimum {
        minimum
    } else {
        (theoretical / dec!(50)).ceil() * dec!(50)
    }
}

/// Bag-making cost class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingType {
    Flat3Side,
    StandUp,
    Zipper,
    ZipperStand,
    TShape,
    MShape,
    Box,
    Other,
}

impl ProcessingType {
    pub fn detect(pouch_type: &str, options: &[String]) -> Self {
        match pouch_type {
            "zipper" => return ProcessingType::Zipper,
            "zipper_stand" => return ProcessingType::ZipperStand,
            _ => {}
        }
        let base = if pouch_type.contains("3_side")
            || pouch_type.contains("flat")
            || pouch_type.contains("three_side")
        {
            ProcessingType::Flat3Side
        } else if pouch_type.contains("stand") {
            ProcessingType::StandUp
        } else if pouch_type.contains("t_shape") {
            ProcessingType::TShape
        } else if pouch_type.contains("m_shape") {
            ProcessingType::MShape
        } else if pouch_type.contains("box") || pouch_type.contains("gusset") {
            ProcessingType::Box
        } else {
            ProcessingType::Other
        };

        if options.iter().any(|o| o == "zipper-yes") {
            match base {
                ProcessingType::Flat3Side => return ProcessingType::Zipper,
                ProcessingType::StandUp => return ProcessingType::ZipperStand,
                _ => {}
            }
        }
        base
    }

    /// KRW per cm of width per pouch, and the minimum charge in KRW.
    pub fn rate(&self) -> (Decimal, Decimal) {
        match self {
            ProcessingType::Flat3Side => (dec!(0.4), dec!(200000)),
            ProcessingType::StandUp | ProcessingType::Zipper => (dec!(1.2), dec!(250000)),
            ProcessingType::ZipperStand => (dec!(1.7), dec!(280000)),
            ProcessingType::TShape | ProcessingType::MShape | ProcessingType::Box => {
                (dec!(1.2), dec!(440000))
            }
            ProcessingType::Other => (dec!(1.0), dec!(200000)),
        }
    }
}

/// Bag-making charge in KRW.
pub fn pouch_processing_cost_krw(
    pouch_type: &str,
    width_mm: Decimal,
    quantity: u32,
    options: &[String],
) -> Decimal {
    let (coefficient, minimum) = ProcessingType::detect(pouch_type, options).rate();
    let total = width_mm / dec!(10) * coefficient * Decimal::from(quantity);
    total.max(minimum)
}

fn cost_breakdown(
    film: &FilmCostResult,
    processing_krw: Decimal,
    rates: &CostRates,
) -> SkuCostBreakdown {
    let base = film.total_cost_krw + processing_krw;
    let manufacturer = base * MANUFACTURER_MARGIN;
    let with_duty = manufacturer * (Decimal::ONE + rates.duty_rate);
    let delivery = film.delivery_cost_krw;
    let import_cost = with_duty + delivery;
    let final_krw = import_cost * SALES_MARGIN;

    let jpy = |krw: Decimal| round_half_up(krw * rates.exchange_rate);
    SkuCostBreakdown {
        material_cost: jpy(film.material_cost),
        printing_cost: jpy(film.printing_cost),
        lamination_cost: jpy(film.lamination_cost),
        slitter_cost: jpy(film.slitter_cost),
        pouch_processing_cost: jpy(processing_krw),
        manufacturing_margin: jpy(manufacturer - base),
        duty: jpy(with_duty - manufacturer),
        delivery: jpy(delivery),
        sales_margin: jpy(final_krw - import_cost),
        total_cost: jpy(final_krw),
    }
}

/// Checks the input and returns the total quantity across SKUs.
fn validate(input: &SkuCostInput) -> Result<u32, PricingError> {
    if input.sku_quantities.is_empty() {
        return Err(PricingError::InvalidInput(
            "At least one SKU quantity is required".to_string(),
        ));
    }
    if input.sku_quantities.contains(&0) {
        return Err(PricingError::InvalidQuantity(0));
    }
    let total = sum_quantities(&input.sku_quantities);
    let total = u32::try_from(total)
        .ok()
        .filter(|&t| t <= MAX_ORDER_QUANTITY)
        .ok_or(PricingError::InvalidQuantity(total))?;
    let dims = &input.dimensions;
    if dims.width <= Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "width",
            value: dims.width,
        });
    }
    if dims.height <= Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "height",
            value: dims.height,
        });
    }
    if dims.depth < Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "depth",
            value: dims.depth,
        });
    }
    Ok(total)
}

pub fn calculate_sku_cost(
    input: &SkuCostInput,
    rates: &CostRates,
) -> Result<SkuCostResult, PricingError> {
    let total_quantity = validate(input)?;

    let dims = &input.dimensions;
    let pouch_type = input.pouch_type.as_str();
    let columns = column_count(pouch_type, dims);
    let width = film_width(pouch_type, dims, columns);
    let material_width = input
        .material_width
        .unwrap_or_else(|| material_width_for(width));
    let sku_count = input.sku_quantities.len();
    let loss_per_sku = FIXED_LOSS_METERS / Decimal::from(sku_count as u64);

    let base_layers = input.film_layers.clone().unwrap_or_else(default_layers);
    let thickness = ThicknessSelection::parse_or_default(input.thickness_selection.as_deref());
    let layers = adjust_layers_for_thickness(&base_layers, thickness);
    let printing_type = if input.post_processing_options.iter().any(|o| o == "matte") {
        FilmPrintingType::Matte
    } else {
        FilmPrintingType::Basic
    };

    let mut cost_per_sku = Vec::with_capacity(sku_count);
    let mut total_weight = Decimal::ZERO;
    for (sku_index, &quantity) in input.sku_quantities.iter().enumerate() {
        let theoretical = theoretical_meters(quantity, pouch_type, dims, columns);
        let secured = secured_meters(theoretical, sku_count);
        let total_meters = secured + loss_per_sku;

        let film = calculate_film_cost(
            &FilmCostInput {
                layers: layers.clone(),
                width: dims.width,
                length: total_meters,
                loss_rate: Some(Decimal::ZERO),
                has_printing: true,
                printing_type,
                material_width: Some(material_width),
                delivery_weight: None,
            },
            rates,
        )?;
        total_weight += film.total_weight;

        let processing = pouch_processing_cost_krw(
            pouch_type,
            dims.width,
            quantity,
            &input.post_processing_options,
        );
        let breakdown = cost_breakdown(&film, processing, rates);
        let cost_jpy = breakdown.total_cost;

        cost_per_sku.push(SkuCost {
            sku_index,
            quantity,
            theoretical_meters: round_dp(theoretical, 2),
            secured_meters: secured,
            loss_meters: round_dp(loss_per_sku, 2),
            total_meters: round_dp(total_meters, 2),
            cost_jpy,
            unit_cost_jpy: round_dp(cost_jpy / Decimal::from(quantity), 2),
            delivery_boxes: film.roll_count,
            cost_breakdown: breakdown,
        });
    }

    let total_cost_jpy: Decimal = cost_per_sku.iter().map(|s| s.cost_jpy).sum();
    let total_secured_meters: Decimal = cost_per_sku.iter().map(|s| s.secured_meters).sum();

    Ok(SkuCostResult {
        total_cost_jpy,
        total_quantity,
        unit_cost_jpy: round_dp(total_cost_jpy / Decimal::from(total_quantity), 2),
        summary: SkuCostSummary {
            total_secured_meters,
            loss_meters: FIXED_LOSS_METERS,
            total_with_loss_meters: total_secured_meters + FIXED_LOSS_METERS,
            total_weight: round_dp(total_weight, 2),
            delivery_boxes: cost_per_sku.iter().map(|s| s.delivery_boxes).sum(),
        },
        cost_per_sku,
        column_count: columns,
        calculated_film_width: width,
        material_width,
    })
}
