//! Film manufacturing cost: raw material per layer, printing, lamination, slitting,
//! currency conversion, import duty and boxed delivery.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::materials::{film_material, FilmLayer};
use super::{round_dp, round_half_up, CostRates, PricingError};

pub const DEFAULT_LOSS_RATE: Decimal = dec!(0.4);
pub const DEFAULT_MATERIAL_WIDTH_MM: Decimal = dec!(740);

/// KRW per metre of printed film, always computed on a 1 m band.
const PRINTING_COST_PER_M: Decimal = dec!(475);
/// KRW per metre per metre of width.
const MATTE_COST_PER_M: Decimal = dec!(20);
const LAMINATION_COST_PER_M2: Decimal = dec!(75);
const SLITTER_COST_PER_M: Decimal = dec!(10);
const SLITTER_MIN_COST: Decimal = dec!(30000);
const DELIVERY_COST_PER_BOX_KRW: Decimal = dec!(127980);
const KG_PER_BOX: Decimal = dec!(29);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FilmPrintingType {
    #[default]
    Basic,
    Matte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilmCostInput {
    pub layers: Vec<FilmLayer>,
    /// Product width in mm
    #[serde(default)]
    pub width: Decimal,
    /// Delivered length in metres, loss excluded
    pub length: Decimal,
    #[serde(default)]
    pub loss_rate: Option<Decimal>,
    #[serde(default = "default_true")]
    pub has_printing: bool,
    #[serde(default)]
    pub printing_type: FilmPrintingType,
    /// Raw material roll width in mm
    #[serde(default)]
    pub material_width: Option<Decimal>,
    /// Shipping weight override in kg
    #[serde(default)]
    pub delivery_weight: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

impl FilmCostInput {
    pub fn new(layers: Vec<FilmLayer>, length: Decimal) -> Self {
        Self {
            layers,
            width: Decimal::ZERO,
            length,
            loss_rate: None,
            has_printing: true,
            printing_type: FilmPrintingType::Basic,
            material_width: None,
            delivery_weight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LayerCost {
    pub material_id: String,
    pub name: String,
    pub cost: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrintingCost {
    pub basic: Decimal,
    pub matte: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LaminationCost {
    pub count: u32,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlitterCost {
    pub calculated: Decimal,
    #[serde(rename = "final")]
    pub final_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilmCostBreakdown {
    pub materials: Vec<LayerCost>,
    pub printing: PrintingCost,
    pub lamination: LaminationCost,
    pub slitter: SlitterCost,
}

/// Film cost in KRW with JPY conversions. Integer amounts are already rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilmCostResult {
    pub material_cost: Decimal,
    pub printing_cost: Decimal,
    pub lamination_cost: Decimal,
    pub slitter_cost: Decimal,
    pub total_cost_krw: Decimal,
    pub delivery_cost_krw: Decimal,
    pub cost_jpy: Decimal,
    pub cost_with_duty_jpy: Decimal,
    pub cost_with_duty_and_delivery_jpy: Decimal,
    /// kg
    pub total_weight: Decimal,
    /// Number of delivery boxes
    pub roll_count: u32,
    pub delivery_cost_jpy: Decimal,
    pub cost_per_meter_jpy: Decimal,
    pub breakdown: FilmCostBreakdown,
}

fn validate(input: &FilmCostInput) -> Result<(), PricingError> {
    if input.length <= Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "length",
            value: input.length,
        });
    }
    if let Some(width) = input.material_width {
        if width <= Decimal::ZERO {
            return Err(PricingError::InvalidDimension {
                field: "material_width",
                value: width,
            });
        }
    }
    if input.layers.is_empty() {
        return Err(PricingError::InvalidInput(
            "At least one film layer is required".to_string(),
        ));
    }
    for layer in &input.layers {
        if film_material(&layer.material_id).is_none() {
            return Err(PricingError::UnknownMaterial(layer.material_id.clone()));
        }
        if layer.thickness == 0 {
            return Err(PricingError::InvalidInput(format!(
                "Layer {} must have a positive thickness",
                layer.material_id
            )));
        }
    }
    Ok(())
}

pub fn calculate_film_cost(
    input: &FilmCostInput,
    rates: &CostRates,
) -> Result<FilmCostResult, PricingError> {
    validate(input)?;

    let loss_rate = input.loss_rate.unwrap_or(DEFAULT_LOSS_RATE);
    let length_with_loss = input.length * (Decimal::ONE + loss_rate);
    let width_m = input.material_width.unwrap_or(DEFAULT_MATERIAL_WIDTH_MM) / dec!(1000);

    // 1. raw material per layer
    let mut materials = Vec::with_capacity(input.layers.len());
    let mut material_total = Decimal::ZERO;
    let mut weight_total = Decimal::ZERO;
    for layer in &input.layers {
        let Some(material) = film_material(&layer.material_id) else {
            continue;
        };
        let weight = Decimal::from(layer.thickness) / dec!(1000)
            * width_m
            * length_with_loss
            * material.density;
        let cost = weight * material.price_per_kg;
        materials.push(LayerCost {
            material_id: layer.material_id.clone(),
            name: material.name_ja.to_string(),
            cost: round_half_up(cost),
            weight: round_dp(weight, 2),
        });
        material_total += cost;
        weight_total += weight;
    }
    let material_cost = round_half_up(material_total);
    let total_weight_rounded = round_dp(weight_total, 2);

    // 2. printing
    let printing = if input.has_printing {
        let basic = length_with_loss * PRINTING_COST_PER_M;
        let matte = match input.printing_type {
            FilmPrintingType::Matte => width_m * MATTE_COST_PER_M * length_with_loss,
            FilmPrintingType::Basic => Decimal::ZERO,
        };
        PrintingCost {
            basic: round_half_up(basic),
            matte: round_half_up(matte),
            total: round_half_up(basic + matte),
        }
    } else {
        PrintingCost {
            basic: Decimal::ZERO,
            matte: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    };

    // 3. lamination: one pass per additional layer
    let lamination_count = input.layers.len().saturating_sub(1) as u32;
    let lamination = LaminationCost {
        count: lamination_count,
        cost: round_half_up(
            width_m * length_with_loss * LAMINATION_COST_PER_M2 * Decimal::from(lamination_count),
        ),
    };

    // 4. slitter with a floor charge
    let slitter_calculated = length_with_loss * SLITTER_COST_PER_M;
    let slitter = SlitterCost {
        calculated: round_half_up(slitter_calculated),
        final_cost: round_half_up(slitter_calculated.max(SLITTER_MIN_COST)),
    };

    let total_cost_krw = material_cost + printing.total + lamination.cost + slitter.final_cost;
    let cost_jpy = total_cost_krw * rates.exchange_rate;
    let cost_with_duty_jpy = cost_jpy * (Decimal::ONE + rates.duty_rate);

    let delivery_weight = input.delivery_weight.unwrap_or(total_weight_rounded);
    let boxes = (delivery_weight / KG_PER_BOX).ceil();
    let delivery_cost_krw = boxes * DELIVERY_COST_PER_BOX_KRW;
    let delivery_cost_jpy = delivery_cost_krw * rates.exchange_rate;
    let cost_with_duty_and_delivery_jpy = cost_with_duty_jpy + delivery_cost_jpy;
    let cost_per_meter_jpy = round_dp(cost_with_duty_and_delivery_jpy / input.length, 4);

    Ok(FilmCostResult {
        material_cost,
        printing_cost: printing.total,
        lamination_cost: lamination.cost,
        slitter_cost: slitter.final_cost,
        total_cost_krw,
        delivery_cost_krw,
        cost_jpy,
        cost_with_duty_jpy,
        cost_with_duty_and_delivery_jpy,
        total_weight: delivery_weight,
        roll_count: super::decimal_to_u32(boxes),
        delivery_cost_jpy,
        cost_per_meter_jpy,
        breakdown: FilmCostBreakdown {
            materials,
            printing,
            lamination,
            slitter,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::materials::default_layers;
    use assert_matches::assert_matches;

    fn rates() -> CostRates {
        CostRates::default()
    }

    #[test]
    fn default_structure_over_1000_metres() {
        let input = FilmCostInput::new(default_layers(), dec!(1000));
        let result = calculate_film_cost(&input, &rates()).unwrap();

        // 1400 m with loss across a 740 mm roll
        let pet = &result.breakdown.materials[0];
        assert_eq!(pet.weight, dec!(17.40));
        assert_eq!(pet.cost, dec!(48733));
        assert_eq!(result.breakdown.printing.basic, dec!(665000));
        assert_eq!(result.breakdown.printing.matte, Decimal::ZERO);
        assert_eq!(result.breakdown.lamination.count, 2);
        assert_eq!(result.lamination_cost, dec!(155400));
        assert_eq!(result.breakdown.slitter.calculated, dec!(14000));
        assert_eq!(result.slitter_cost, dec!(30000));
        assert_eq!(
            result.total_cost_krw,
            result.material_cost + dec!(665000) + dec!(155400) + dec!(30000)
        );
        assert_eq!(result.cost_jpy, result.total_cost_krw * dec!(0.12));
    }

    #[test]
    fn boxes_follow_weight() {
        let mut input = FilmCostInput::new(default_layers(), dec!(500));
        input.delivery_weight = Some(dec!(58.5));
        let result = calculate_film_cost(&input, &rates()).unwrap();
        assert_eq!(result.roll_count, 3);
        assert_eq!(result.delivery_cost_krw, dec!(383940));
        assert_eq!(result.delivery_cost_jpy, dec!(46072.80));
        assert_eq!(
            result.cost_with_duty_and_delivery_jpy,
            result.cost_with_duty_jpy + dec!(46072.80)
        );
    }

    #[test]
    fn matte_adds_width_based_surcharge() {
        let mut input = FilmCostInput::new(default_layers(), dec!(500));
        input.loss_rate = Some(Decimal::ZERO);
        input.material_width = Some(dec!(590));
        input.printing_type = FilmPrintingType::Matte;
        let result = calculate_film_cost(&input, &rates()).unwrap();
        assert_eq!(result.breakdown.printing.matte, dec!(5900));
        assert_eq!(result.printing_cost, dec!(237500) + dec!(5900));
    }

    #[test]
    fn no_printing_costs_nothing() {
        let mut input = FilmCostInput::new(default_layers(), dec!(100));
        input.has_printing = false;
        let result = calculate_film_cost(&input, &rates()).unwrap();
        assert_eq!(result.printing_cost, Decimal::ZERO);
    }

    #[test]
    fn single_layer_has_no_lamination() {
        let input = FilmCostInput::new(vec![FilmLayer::new("PE", 50)], dec!(100));
        let result = calculate_film_cost(&input, &rates()).unwrap();
        assert_eq!(result.breakdown.lamination.count, 0);
        assert_eq!(result.lamination_cost, Decimal::ZERO);
        assert_eq!(result.breakdown.materials[0].name, "LLDPE");
    }

    #[test]
    fn rejects_invalid_input() {
        let input = FilmCostInput::new(default_layers(), Decimal::ZERO);
        assert_matches!(
            calculate_film_cost(&input, &rates()),
            Err(PricingError::InvalidDimension { field: "length", .. })
        );

        let input = FilmCostInput::new(vec![], dec!(10));
        assert_matches!(
            calculate_film_cost(&input, &rates()),
            Err(PricingError::InvalidInput(_))
        );

        let input = FilmCostInput::new(vec![FilmLayer::new("GOLD", 5)], dec!(10));
        assert_matches!(
            calculate_film_cost(&input, &rates()),
            Err(PricingError::UnknownMaterial(id)) if id == "GOLD"
        );
    }
}
