//! Economic order quantity, parallel (multi-lane) production options and the parallel
//! production discount.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::film::{calculate_film_cost, FilmCostInput, FilmPrintingType};
use super::materials::FilmLayer;
use super::pouch::{film_width, PouchDimensions, FIXED_LOSS_METERS};
use super::unified::MIN_DIMENSION_MM;
use super::{decimal_to_u32, round_dp, round_half_up, CostRates, PricingError};

/// 500 m secured plus 400 m loss.
pub const MINIMUM_FILM_USAGE_M: Decimal = dec!(900);
pub const ROLL_WIDTHS_MM: [u32; 2] = [590, 760];
/// 10 mm trimmed on each edge of the raw roll.
const ROLL_EDGE_TRIM_MM: Decimal = dec!(20);
const RECOMMENDED_UTILIZATION: Decimal = dec!(75);
/// Lanes of the narrowest pouch on the widest roll: floor((760 - 20) / 10).
pub const MAX_PARALLEL_LANES: u32 = 74;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EconomicQuantityInput {
    /// Pouches, or metres for roll film
    pub order_quantity: u32,
    pub dimensions: PouchDimensions,
    pub pouch_type: String,
    /// Metres of film the current order consumes
    pub current_film_usage: Decimal,
    /// JPY per pouch (or per metre for roll film)
    pub current_unit_price: Decimal,
    /// When present, parallel options are costed through the film calculator
    #[serde(default)]
    pub film_layers: Option<Vec<FilmLayer>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParallelProductionOption {
    pub option_number: u32,
    pub quantity: u32,
    pub material_width: u32,
    pub parallel_count: u32,
    pub film_width_utilization: Decimal,
    pub estimated_unit_cost: Decimal,
    pub savings_rate: Decimal,
    pub is_recommended: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EconomicQuantitySuggestion {
    pub order_quantity: u32,
    pub minimum_order_quantity: u32,
    pub minimum_film_usage: Decimal,
    pub pouches_per_meter: Decimal,
    pub economic_quantity: u32,
    pub economic_film_usage: Decimal,
    /// %
    pub efficiency_improvement: Decimal,
    pub unit_cost_at_order_qty: Decimal,
    pub unit_cost_at_economic_qty: Decimal,
    pub cost_savings: Decimal,
    /// %
    pub cost_savings_rate: Decimal,
    pub waste_quantity: i64,
    /// %
    pub waste_rate: Decimal,
    pub recommended_quantity: u32,
    pub recommendation_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_production_options: Option<Vec<ParallelProductionOption>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParallelDiscountBreakdown {
    pub first_unit: Decimal,
    pub additional_units: Decimal,
    pub additional_unit_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParallelDiscountDetail {
    pub original_price: Decimal,
    pub discounted_price: Decimal,
    pub discount_amount: Decimal,
    /// %
    pub discount_rate: Decimal,
    pub discount_multiplier: Decimal,
    pub breakdown: ParallelDiscountBreakdown,
}

/// Price multiplier for `count` parallel lanes: the second lane costs 60%, every further lane 30%.
pub fn parallel_discount_multiplier(count: u32) -> Decimal {
    let mut multiplier = Decimal::ONE;
    if count >= 2 {
        multiplier += dec!(0.6);
    }
    if count >= 3 {
        multiplier += dec!(0.3) * Decimal::from(count - 2);
    }
    multiplier
}

pub fn parallel_discount(base: Decimal, count: u32) -> Decimal {
    if count <= 1 {
        return base;
    }
    base * parallel_discount_multiplier(count)
}

pub fn parallel_discount_detail(
    base: Decimal,
    count: u32,
) -> Result<ParallelDiscountDetail, PricingError> {
    if count == 0 {
        return Err(PricingError::InvalidInput(
            "Parallel count must be at least 1".to_string(),
        ));
    }
    let too_large = || PricingError::InvalidInput("Base price is too large".to_string());
    let original = base
        .checked_mul(Decimal::from(count))
        .ok_or_else(too_large)?;
    let discounted = if count == 1 {
        base
    } else {
        base.checked_mul(parallel_discount_multiplier(count))
            .ok_or_else(too_large)?
    };
    let amount = original - discounted;
    let rate = if original.is_zero() {
        Decimal::ZERO
    } else {
        amount / original * dec!(100)
    };

    Ok(ParallelDiscountDetail {
        original_price: round_half_up(original),
        discounted_price: round_half_up(discounted),
        discount_amount: round_half_up(amount),
        discount_rate: round_dp(rate, 1),
        discount_multiplier: round_dp(parallel_discount_multiplier(count), 2),
        breakdown: ParallelDiscountBreakdown {
            first_unit: round_half_up(base),
            additional_units: round_half_up(discounted - base),
            additional_unit_count: count - 1,
        },
    })
}

/// Formats with thousands separators, e.g. `12,500`.
fn grouped(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn validate(input: &EconomicQuantityInput) -> Result<(), PricingError> {
    if input.order_quantity == 0 {
        return Err(PricingError::InvalidQuantity(0));
    }
    if input.dimensions.width < MIN_DIMENSION_MM {
        return Err(PricingError::InvalidDimension {
            field: "width",
            value: input.dimensions.width,
        });
    }
    if input.pouch_type != "roll_film" && input.current_film_usage <= Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "current_film_usage",
            value: input.current_film_usage,
        });
    }
    if input.current_unit_price <= Decimal::ZERO {
        return Err(PricingError::InvalidInput(
            "Current unit price must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn calculate_economic_quantity(
    input: &EconomicQuantityInput,
    rates: &CostRates,
) -> Result<EconomicQuantitySuggestion, PricingError> {
    validate(input)?;

    let order_qty = Decimal::from(input.order_quantity);
    let effective_usage = if input.pouch_type == "roll_film" {
        order_qty
    } else {
        input.current_film_usage
    };
    let pouches_per_meter = dec!(1000) / input.dimensions.width;
    let economic_quantity = decimal_to_u32((MINIMUM_FILM_USAGE_M * pouches_per_meter).floor());
    let economic = Decimal::from(economic_quantity);

    let current_efficiency = order_qty / effective_usage;
    let economic_efficiency = economic / MINIMUM_FILM_USAGE_M;
    let efficiency_improvement =
        (economic_efficiency - current_efficiency) / current_efficiency * dec!(100);

    let unit_cost_at_order_qty = input.current_unit_price;
    let unit_cost_at_economic_qty = if economic.is_zero() {
        unit_cost_at_order_qty
    } else {
        unit_cost_at_order_qty * order_qty / economic
    };
    let cost_savings = unit_cost_at_order_qty - unit_cost_at_economic_qty;
    let cost_savings_rate = cost_savings / unit_cost_at_order_qty * dec!(100);

    let waste_quantity = i64::from(economic_quantity) - i64::from(input.order_quantity);
    let waste_rate = if economic.is_zero() {
        Decimal::ZERO
    } else {
        Decimal::from(waste_quantity) / economic * dec!(100)
    };
    let waste_display = round_dp(waste_rate, 1);

    let order = grouped(input.order_quantity);
    let econ = grouped(economic_quantity);
    let (recommended_quantity, recommendation_reason) = if waste_quantity <= 0 {
        (
            input.order_quantity,
            format!("注文数量推奨：{order}個で最小フィルム使用量を満たしています"),
        )
    } else if waste_rate <= dec!(10) {
        (
            economic_quantity,
            format!(
                "フィルム効率最大化：{order}個 → {econ}個（無駄{}個、{waste_display}%）",
                grouped(decimal_to_u32(Decimal::from(waste_quantity)))
            ),
        )
    } else if waste_rate <= dec!(30) {
        (
            input.order_quantity,
            format!(
                "選択肢提示：{order}個（注文通り）または{econ}個（フィルム効率化、無駄{waste_display}%）"
            ),
        )
    } else {
        (
            input.order_quantity,
            format!(
                "注文数量推奨：無駄を避けるため{order}個を推奨（経済的数量の場合{waste_display}%の無駄発生）"
            ),
        )
    };

    let parallel_production_options = calculate_parallel_options(
        &input.dimensions,
        &input.pouch_type,
        effective_usage,
        input.current_unit_price,
        input.film_layers.as_deref(),
        rates,
    )?;

    Ok(EconomicQuantitySuggestion {
        order_quantity: input.order_quantity,
        minimum_order_quantity: economic_quantity,
        minimum_film_usage: MINIMUM_FILM_USAGE_M,
        pouches_per_meter: round_dp(pouches_per_meter, 4),
        economic_quantity,
        economic_film_usage: MINIMUM_FILM_USAGE_M,
        efficiency_improvement: round_dp(efficiency_improvement, 2),
        unit_cost_at_order_qty,
        unit_cost_at_economic_qty: round_dp(unit_cost_at_economic_qty, 2),
        cost_savings: round_dp(cost_savings, 2),
        cost_savings_rate: round_dp(cost_savings_rate, 2),
        waste_quantity,
        waste_rate: round_dp(waste_rate, 2),
        recommended_quantity,
        recommendation_reason,
        parallel_production_options,
    })
}

/// Lane options on the 590 and 760 mm rolls for roll film, T-shape and M-shape pouches.
///
/// Returns `None` for other shapes or when no roll fits two lanes.
pub fn calculate_parallel_options(
    dims: &PouchDimensions,
    pouch_type: &str,
    film_usage: Decimal,
    unit_price: Decimal,
    film_layers: Option<&[FilmLayer]>,
    rates: &CostRates,
) -> Result<Option<Vec<ParallelProductionOption>>, PricingError> {
    if !matches!(pouch_type, "roll_film" | "t_shape" | "m_shape") {
        return Ok(None);
    }

    let lane_width = if pouch_type == "roll_film" {
        dims.width
    } else {
        film_width(pouch_type, dims, 1)
    };
    if lane_width <= Decimal::ZERO {
        return Err(PricingError::InvalidDimension {
            field: "width",
            value: lane_width,
        });
    }
    let film_layers = film_layers.filter(|layers| !layers.is_empty());

    let mut options: Vec<ParallelProductionOption> = Vec::new();
    // best utilization seen per lane count
    let mut best: HashMap<u32, Decimal> = HashMap::new();
    for roll in ROLL_WIDTHS_MM {
        let roll_width = Decimal::from(roll);
        let max_count = decimal_to_u32(((roll_width - ROLL_EDGE_TRIM_MM) / lane_width).floor())
            .min(MAX_PARALLEL_LANES);

        for count in 2..=max_count {
            let utilization = Decimal::from(count) * lane_width / roll_width * dec!(100);
            if best.get(&count).is_some_and(|&seen| seen > utilization) {
                continue;
            }
            best.insert(count, utilization);

            let estimated_unit_cost = match film_layers {
                Some(layers) => {
                    let costed_width = if roll == 760 { dec!(740) } else { dec!(570) };
                    let film = calculate_film_cost(
                        &FilmCostInput {
                            layers: layers.to_vec(),
                            width: costed_width,
                            length: film_usage + FIXED_LOSS_METERS,
                            loss_rate: Some(Decimal::ZERO),
                            has_printing: true,
                            printing_type: FilmPrintingType::Basic,
                            material_width: Some(costed_width),
                            delivery_weight: None,
                        },
                        rates,
                    )?;
                    let discountable = (film.material_cost
                        + film.printing_cost
                        + film.lamination_cost)
                        * rates.exchange_rate;
                    let non_discountable =
                        film.slitter_cost * rates.exchange_rate + film.delivery_cost_jpy;
                    (parallel_discount(discountable, count) + non_discountable)
                        / Decimal::from(count)
                }
                None => parallel_discount(unit_price * dec!(0.7), count) + unit_price * dec!(0.3),
            };
            let savings_rate = (unit_price - estimated_unit_cost) / unit_price * dec!(100);

            options.push(ParallelProductionOption {
                option_number: 0,
                quantity: count,
                material_width: roll,
                parallel_count: count,
                film_width_utilization: round_dp(utilization, 2),
                estimated_unit_cost: round_dp(estimated_unit_cost, 2),
                savings_rate: round_dp(savings_rate, 2),
                is_recommended: false,
                reason: format!(
                    "{count}本注文時 {roll}mm原反使用 ({}%効率)",
                    round_half_up(utilization)
                ),
            });
        }
    }

    if options.is_empty() {
        return Ok(None);
    }

    options.sort_by(|a, b| b.film_width_utilization.cmp(&a.film_width_utilization));
    let max_utilization = options[0].film_width_utilization;
    for (index, option) in options.iter_mut().enumerate() {
        option.option_number = index as u32 + 1;
        if option.film_width_utilization >= RECOMMENDED_UTILIZATION
            || option.film_width_utilization == max_utilization
        {
            option.is_recommended = true;
            option.reason = format!(
                "⭐ 推奨: {}本注文時 {}mm原反を効率的に使用 ({}%活用, 単価{}%節減)",
                option.quantity,
                option.material_width,
                round_half_up(option.film_width_utilization),
                round_half_up(option.savings_rate)
            );
        }
    }
    Ok(Some(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::materials::default_layers;
    use assert_matches::assert_matches;
    use test_case::test_case;

    fn roll_input(width: Decimal, metres: u32) -> EconomicQuantityInput {
        EconomicQuantityInput {
            order_quantity: metres,
            dimensions: PouchDimensions::new(width, Decimal::ZERO, Decimal::ZERO),
            pouch_type: "roll_film".to_string(),
            current_film_usage: Decimal::ZERO,
            current_unit_price: dec!(100),
            film_layers: None,
        }
    }

    #[test_case(1, dec!(1))]
    #[test_case(2, dec!(1.6))]
    #[test_case(3, dec!(1.9))]
    #[test_case(5, dec!(2.5))]
    fn discount_multiplier(count: u32, expected: Decimal) {
        assert_eq!(parallel_discount_multiplier(count), expected);
        assert_eq!(parallel_discount(dec!(1000), count), dec!(1000) * expected);
    }

    #[test]
    fn discount_detail_for_three_lanes() {
        let detail = parallel_discount_detail(dec!(10000), 3).unwrap();
        assert_eq!(detail.original_price, dec!(30000));
        assert_eq!(detail.discounted_price, dec!(19000));
        assert_eq!(detail.discount_amount, dec!(11000));
        assert_eq!(detail.discount_rate, dec!(36.7));
        assert_eq!(detail.discount_multiplier, dec!(1.9));
        assert_eq!(detail.breakdown.first_unit, dec!(10000));
        assert_eq!(detail.breakdown.additional_units, dec!(9000));
        assert_eq!(detail.breakdown.additional_unit_count, 2);

        assert_matches!(
            parallel_discount_detail(dec!(100), 0),
            Err(PricingError::InvalidInput(_))
        );
    }

    #[test]
    fn discount_detail_rejects_unrepresentable_prices() {
        assert_matches!(
            parallel_discount_detail(Decimal::MAX, 100),
            Err(PricingError::InvalidInput(_))
        );
        // two lanes fit in the undiscounted total but not at the 1.6 multiplier
        assert_matches!(
            parallel_discount_detail(Decimal::MAX / dec!(2), 2),
            Err(PricingError::InvalidInput(_))
        );
        // a single lane is just the base price
        let single = parallel_discount_detail(Decimal::MAX, 1).unwrap();
        assert_eq!(single.discount_amount, Decimal::ZERO);
    }

    #[test]
    fn economic_width_below_minimum_is_rejected() {
        assert_matches!(
            calculate_economic_quantity(&roll_input(dec!(1), 500), &CostRates::default()),
            Err(PricingError::InvalidDimension { field: "width", .. })
        );
        assert_matches!(
            calculate_economic_quantity(&roll_input(dec!(9.9), 500), &CostRates::default()),
            Err(PricingError::InvalidDimension { field: "width", .. })
        );
    }

    #[test]
    fn narrowest_web_keeps_one_option_per_lane_count() {
        let result =
            calculate_economic_quantity(&roll_input(dec!(10), 500), &CostRates::default()).unwrap();
        let options = result.parallel_production_options.unwrap();
        // 590: 2..=57 lanes, 760 adds 58..=74; shared counts keep the 590 option
        assert_eq!(options.len(), (2..=MAX_PARALLEL_LANES).count());
        let mut counts: Vec<u32> = options.iter().map(|o| o.parallel_count).collect();
        counts.sort_unstable();
        counts.dedup();
        assert_eq!(counts.len(), options.len());
        assert!(options.iter().all(|o| o.parallel_count <= MAX_PARALLEL_LANES));
    }

    #[test]
    fn economic_quantity_for_small_order() {
        let input = EconomicQuantityInput {
            order_quantity: 1000,
            dimensions: PouchDimensions::new(dec!(100), dec!(150), Decimal::ZERO),
            pouch_type: "flat_3_side".to_string(),
            current_film_usage: dec!(900),
            current_unit_price: dec!(90),
            film_layers: None,
        };
        let result = calculate_economic_quantity(&input, &CostRates::default()).unwrap();
        assert_eq!(result.pouches_per_meter, dec!(10));
        assert_eq!(result.economic_quantity, 9000);
        assert_eq!(result.minimum_order_quantity, 9000);
        assert_eq!(result.unit_cost_at_economic_qty, dec!(10));
        assert_eq!(result.cost_savings, dec!(80));
        assert_eq!(result.waste_quantity, 8000);
        // 88.9% waste keeps the order quantity
        assert_eq!(result.recommended_quantity, 1000);
        assert!(result.recommendation_reason.starts_with("注文数量推奨"));
        assert!(result.parallel_production_options.is_none());
    }

    #[test]
    fn economic_quantity_recommended_when_waste_is_small() {
        let input = EconomicQuantityInput {
            order_quantity: 8500,
            dimensions: PouchDimensions::new(dec!(100), dec!(150), Decimal::ZERO),
            pouch_type: "stand_up".to_string(),
            current_film_usage: dec!(1250),
            current_unit_price: dec!(20),
            film_layers: None,
        };
        let result = calculate_economic_quantity(&input, &CostRates::default()).unwrap();
        assert_eq!(result.recommended_quantity, 9000);
        assert!(result.recommendation_reason.contains("8,500個 → 9,000個"));
    }

    #[test]
    fn middle_waste_presents_both_choices() {
        let input = EconomicQuantityInput {
            order_quantity: 7000,
            dimensions: PouchDimensions::new(dec!(100), dec!(150), Decimal::ZERO),
            pouch_type: "stand_up".to_string(),
            current_film_usage: dec!(1100),
            current_unit_price: dec!(20),
            film_layers: None,
        };
        let result = calculate_economic_quantity(&input, &CostRates::default()).unwrap();
        assert_eq!(result.recommended_quantity, 7000);
        assert!(result.recommendation_reason.starts_with("選択肢提示"));
    }

    #[test]
    fn roll_film_gets_parallel_options() {
        let result =
            calculate_economic_quantity(&roll_input(dec!(200), 500), &CostRates::default()).unwrap();
        let options = result.parallel_production_options.unwrap();
        // 590: floor(570/200)=2 lanes, 760: floor(740/200)=3 lanes (2 lanes skipped as worse)
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].material_width, 760);
        assert_eq!(options[0].parallel_count, 3);
        assert_eq!(options[0].film_width_utilization, dec!(78.95));
        assert!(options[0].is_recommended);
        assert!(options[0].reason.starts_with("⭐ 推奨: 3本注文時 760mm"));
        assert_eq!(options[1].material_width, 590);
        assert!(!options[1].is_recommended);
        assert_eq!(options[1].reason, "2本注文時 590mm原反使用 (68%効率)");
        assert_eq!(
            options.iter().map(|o| o.option_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn fallback_unit_cost_uses_70_30_split() {
        let options = calculate_parallel_options(
            &PouchDimensions::new(dec!(200), Decimal::ZERO, Decimal::ZERO),
            "roll_film",
            dec!(500),
            dec!(100),
            None,
            &CostRates::default(),
        )
        .unwrap()
        .unwrap();
        let two_lane = options.iter().find(|o| o.parallel_count == 2).unwrap();
        // 70 × 1.6 + 30
        assert_eq!(two_lane.estimated_unit_cost, dec!(142));
    }

    #[test]
    fn accurate_parallel_cost_with_layers() {
        let options = calculate_parallel_options(
            &PouchDimensions::new(dec!(200), Decimal::ZERO, Decimal::ZERO),
            "roll_film",
            dec!(500),
            dec!(1000),
            Some(&default_layers()),
            &CostRates::default(),
        )
        .unwrap()
        .unwrap();
        assert!(options.iter().all(|o| o.estimated_unit_cost > Decimal::ZERO));
    }

    #[test]
    fn parallel_options_only_for_wide_shapes() {
        let dims = PouchDimensions::new(dec!(100), dec!(150), Decimal::ZERO);
        let none = calculate_parallel_options(
            &dims,
            "stand_up",
            dec!(500),
            dec!(50),
            None,
            &CostRates::default(),
        )
        .unwrap();
        assert!(none.is_none());

        // a 600 mm web never fits twice
        let wide = calculate_parallel_options(
            &PouchDimensions::new(dec!(600), Decimal::ZERO, Decimal::ZERO),
            "roll_film",
            dec!(500),
            dec!(50),
            None,
            &CostRates::default(),
        )
        .unwrap();
        assert!(wide.is_none());
    }

    #[test]
    fn grouping_digits() {
        assert_eq!(grouped(0), "0");
        assert_eq!(grouped(999), "999");
        assert_eq!(grouped(1000), "1,000");
        assert_eq!(grouped(1234567), "1,234,567");
    }
}
