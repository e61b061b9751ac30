//! Side-by-side pricing of one specification at several quantities.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::unified::{QuoteRequest, QuoteResult};
use super::{round_half_up, PricingError};

pub const MAX_COMPARED_QUANTITIES: usize = 10;
const TREND_THRESHOLD: Decimal = dec!(0.05);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuantityQuote {
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub lead_time_days: u32,
    pub minimum_price_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BestValue {
    pub quantity: u32,
    pub savings: Decimal,
    /// % below the most expensive unit price
    pub percentage: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceBreak {
    pub quantity: u32,
    pub price_break: Option<String>,
    /// %
    pub discount_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScaleEconomy {
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_savings: Decimal,
    /// Actual cost as % of the cost at the smallest quantity's unit price
    pub efficiency: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    /// Unit prices fall as quantity rises
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuantityTrends {
    pub price_trend: PriceTrend,
    pub optimal_quantity: u32,
    /// %
    pub diminishing_returns: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    CostOptimized,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuantityRecommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub reasoning: Vec<String>,
    pub estimated_savings: Decimal,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MultiQuantityComparison {
    pub quotes: Vec<QuantityQuote>,
    pub best_value: BestValue,
    pub price_breaks: Vec<PriceBreak>,
    pub economies_of_scale: Vec<ScaleEconomy>,
    pub trends: QuantityTrends,
    pub recommendations: Vec<QuantityRecommendation>,
}

/// Prices `base` at each quantity through `price` and analyses the results.
///
/// Quantities are de-duplicated and sorted ascending.
pub fn compare_quantities<F>(
    base: &QuoteRequest,
    quantities: &[u32],
    mut price: F,
) -> Result<MultiQuantityComparison, PricingError>
where
    F: FnMut(&QuoteRequest) -> Result<QuoteResult, PricingError>,
{
    let mut sorted = quantities.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.is_empty() {
        return Err(PricingError::InvalidInput(
            "At least one quantity is required".to_string(),
        ));
    }
    if sorted.len() > MAX_COMPARED_QUANTITIES {
        return Err(PricingError::InvalidInput(format!(
            "At most {MAX_COMPARED_QUANTITIES} quantities can be compared"
        )));
    }

    let mut quotes = Vec::with_capacity(sorted.len());
    for &quantity in &sorted {
        let mut request = base.clone();
        request.quantity = quantity;
        request.sku_quantities = None;
        request.use_sku_calculation = false;
        let result = price(&request)?;
        quotes.push(QuantityQuote {
            quantity,
            unit_price: result.unit_price,
            total_price: result.total_price,
            lead_time_days: result.lead_time_days,
            minimum_price_applied: result.minimum_price_applied,
        });
    }

    let unit_prices: Vec<Decimal> = quotes.iter().map(|q| q.unit_price).collect();
    let best_value = best_value(&quotes);
    let economies_of_scale = economies_of_scale(&quotes);
    let trends = QuantityTrends {
        price_trend: price_trend(&unit_prices),
        optimal_quantity: optimal_quantity(&quotes),
        diminishing_returns: diminishing_returns(&unit_prices),
    };
    let recommendations = recommendations(&sorted, &best_value, &economies_of_scale);

    Ok(MultiQuantityComparison {
        price_breaks: sorted.iter().map(|&q| price_break(q)).collect(),
        quotes,
        best_value,
        economies_of_scale,
        trends,
        recommendations,
    })
}

fn best_value(quotes: &[QuantityQuote]) -> BestValue {
    let mut best = &quotes[0];
    for quote in quotes {
        if quote.unit_price < best.unit_price {
            best = quote;
        }
    }
    let highest = quotes
        .iter()
        .map(|q| q.unit_price)
        .max()
        .unwrap_or(Decimal::ZERO);
    let savings_pct = if highest > Decimal::ZERO {
        (highest - best.unit_price) / highest * dec!(100)
    } else {
        Decimal::ZERO
    };
    BestValue {
        quantity: best.quantity,
        savings: round_half_up(savings_pct * Decimal::from(best.quantity)),
        percentage: round_half_up(savings_pct),
        reason: "最も効率的な単価".to_string(),
    }
}

pub fn price_break(quantity: u32) -> PriceBreak {
    let (label, discount_rate) = match quantity {
        q if q >= 50_000 => (Some("大ロット"), 40),
        q if q >= 20_000 => (Some("中ロット"), 30),
        q if q >= 10_000 => (Some("標準ロット"), 20),
        q if q >= 5_000 => (Some("小ロット"), 10),
        _ => (None, 0),
    };
    PriceBreak {
        quantity,
        price_break: label.map(str::to_string),
        discount_rate,
    }
}

fn economies_of_scale(quotes: &[QuantityQuote]) -> Vec<ScaleEconomy> {
    let baseline = quotes[0].unit_price;
    quotes
        .iter()
        .map(|quote| {
            let qty = Decimal::from(quote.quantity);
            let actual = quote.unit_price * qty;
            let baseline_cost = baseline * qty;
            let efficiency = if baseline_cost > Decimal::ZERO {
                round_half_up(actual / baseline_cost * dec!(100))
            } else {
                dec!(100)
            };
            ScaleEconomy {
                quantity: quote.quantity,
                unit_price: quote.unit_price,
                total_savings: baseline_cost - actual,
                efficiency,
            }
        })
        .collect()
}

/// Compares the average unit price of the larger half against the smaller half.
pub fn price_trend(prices: &[Decimal]) -> PriceTrend {
    if prices.len() < 2 {
        return PriceTrend::Stable;
    }
    let (first, second) = prices.split_at(prices.len() / 2);
    let average = |xs: &[Decimal]| xs.iter().sum::<Decimal>() / Decimal::from(xs.len() as u64);
    let first_avg = average(first);
    if first_avg.is_zero() {
        return PriceTrend::Stable;
    }
    let difference = (average(second) - first_avg) / first_avg;
    if difference < -TREND_THRESHOLD {
        PriceTrend::Improving
    } else if difference > TREND_THRESHOLD {
        PriceTrend::Declining
    } else {
        PriceTrend::Stable
    }
}

fn optimal_quantity(quotes: &[QuantityQuote]) -> u32 {
    let mut optimal = &quotes[0];
    let ratio = |q: &QuantityQuote| q.unit_price / Decimal::from(q.quantity);
    for quote in quotes {
        if ratio(quote) < ratio(optimal) {
            optimal = quote;
        }
    }
    optimal.quantity
}

/// How much smaller the last price step is than the first, in %.
pub fn diminishing_returns(prices: &[Decimal]) -> Decimal {
    let n = prices.len();
    if n < 3 || prices[0].is_zero() || prices[n - 2].is_zero() {
        return Decimal::ZERO;
    }
    let first = (prices[0] - prices[1]) / prices[0];
    if first.is_zero() {
        return Decimal::ZERO;
    }
    let last = (prices[n - 2] - prices[n - 1]) / prices[n - 2];
    round_half_up((Decimal::ONE - last / first) * dec!(100))
}

fn recommendations(
    sorted: &[u32],
    best: &BestValue,
    economies: &[ScaleEconomy],
) -> Vec<QuantityRecommendation> {
    let efficiency_of = |quantity: u32| {
        economies
            .iter()
            .find(|e| e.quantity == quantity)
            .map(|e| e.efficiency)
            .unwrap_or(dec!(100))
    };
    let middle = sorted[sorted.len() / 2];
    let middle_savings = economies
        .iter()
        .find(|e| e.quantity == middle)
        .map(|e| e.total_savings)
        .unwrap_or(Decimal::ZERO);

    vec![
        QuantityRecommendation {
            kind: RecommendationKind::CostOptimized,
            title: "最適コスト推奨".to_string(),
            description: format!("{}個が最も効率的な単価です", best.quantity),
            quantity: best.quantity,
            reasoning: vec![
                format!("単価が最も低い ({}個)", best.quantity),
                format!("コスト効率: {}%", efficiency_of(best.quantity)),
                format!("{}%のコスト削減", best.percentage),
            ],
            estimated_savings: best.savings,
            confidence: 0.95,
        },
        QuantityRecommendation {
            kind: RecommendationKind::Balanced,
            title: "バランス推奨".to_string(),
            description: "コストと在庫のバランスが取れた数量".to_string(),
            quantity: middle,
            reasoning: vec![
                "中間的な数量でリスクを分散".to_string(),
                "適切な在庫管理が可能".to_string(),
                "合理的な単価を維持".to_string(),
            ],
            estimated_savings: middle_savings,
            confidence: 0.80,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::unified::calculate_quote;
    use crate::services::pricing::CostRates;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use test_case::test_case;

    fn base() -> QuoteRequest {
        QuoteRequest::new("stand_up", "PET", dec!(130), dec!(200), 1000)
    }

    fn engine(request: &QuoteRequest) -> Result<QuoteResult, PricingError> {
        calculate_quote(request, &CostRates::default(), Utc::now())
    }

    #[test]
    fn compares_sorted_unique_quantities() {
        let result = compare_quantities(&base(), &[10000, 1000, 5000, 1000], engine).unwrap();
        let quantities: Vec<u32> = result.quotes.iter().map(|q| q.quantity).collect();
        assert_eq!(quantities, vec![1000, 5000, 10000]);
        assert_eq!(result.best_value.quantity, 10000);
        assert_eq!(result.trends.price_trend, PriceTrend::Improving);
        assert_eq!(result.trends.optimal_quantity, 10000);
        assert_eq!(result.economies_of_scale[0].efficiency, dec!(100));
        assert!(result.economies_of_scale[2].efficiency < dec!(100));
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.recommendations[0].kind, RecommendationKind::CostOptimized);
        assert_eq!(result.recommendations[1].quantity, 5000);
    }

    #[test]
    fn invalid_quantity_is_rejected() {
        assert_matches!(
            compare_quantities(&base(), &[50, 1000], engine),
            Err(PricingError::InvalidQuantity(50))
        );
        assert_matches!(
            compare_quantities(&base(), &[], engine),
            Err(PricingError::InvalidInput(_))
        );
    }

    #[test_case(60000, Some("大ロット"), 40)]
    #[test_case(20000, Some("中ロット"), 30)]
    #[test_case(10000, Some("標準ロット"), 20)]
    #[test_case(5000, Some("小ロット"), 10)]
    #[test_case(4999, None, 0)]
    fn price_break_tiers(quantity: u32, label: Option<&str>, rate: u32) {
        let pb = price_break(quantity);
        assert_eq!(pb.price_break.as_deref(), label);
        assert_eq!(pb.discount_rate, rate);
    }

    #[test]
    fn trend_thresholds() {
        assert_eq!(price_trend(&[dec!(100)]), PriceTrend::Stable);
        assert_eq!(price_trend(&[dec!(100), dec!(97)]), PriceTrend::Stable);
        assert_eq!(price_trend(&[dec!(100), dec!(90)]), PriceTrend::Improving);
        assert_eq!(price_trend(&[dec!(100), dec!(110)]), PriceTrend::Declining);
    }

    #[test]
    fn diminishing_returns_needs_three_points() {
        assert_eq!(diminishing_returns(&[dec!(100), dec!(80)]), Decimal::ZERO);
        // first step 20%, last step 10% -> 50
        assert_eq!(
            diminishing_returns(&[dec!(100), dec!(80), dec!(72)]),
            dec!(50)
        );
        assert_eq!(
            diminishing_returns(&[dec!(100), dec!(100), dec!(90)]),
            Decimal::ZERO
        );
    }
}
