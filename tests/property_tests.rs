//! Property-based tests for pricing arithmetic and status vocabularies.
//!
//! These run against the library directly; no database is involved.

use epack_api::{
    config::PricingConfig,
    models::{
        order_status::ORDER_SEQUENCE,
        shipment::clean_tracking_number,
        Carrier, OrderStatus, ProductionStage,
    },
    services::{
        pricing::{
            economic::{parallel_discount, parallel_discount_multiplier},
            unified::{QuoteRequest, MINIMUM_PRICE},
            PricingService,
        },
        quotations::calculate_totals,
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn yen_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..100).prop_map(|(yen, sen)| Decimal::new(yen * 100 + sen as i64, 2))
}

fn bag_type_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("flat_3_side"),
        Just("stand_up"),
        Just("box"),
        Just("t_shape"),
        Just("m_shape"),
    ]
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Quotation),
        Just(OrderStatus::DataReceived),
        Just(OrderStatus::WorkOrder),
        Just(OrderStatus::ContractSent),
        Just(OrderStatus::ContractSigned),
        Just(OrderStatus::Production),
        Just(OrderStatus::StockIn),
        Just(OrderStatus::Shipped),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn totals_are_rounded_up_to_hundreds(lines in prop::collection::vec(yen_strategy(), 1..6)) {
        let sum: Decimal = lines.iter().copied().sum();
        let totals = calculate_totals(lines, dec!(0.10)).unwrap();

        prop_assert!(totals.subtotal >= sum);
        prop_assert!(totals.subtotal - sum < dec!(100));
        prop_assert_eq!(totals.subtotal % dec!(100), Decimal::ZERO);
        prop_assert_eq!(totals.total_amount % dec!(100), Decimal::ZERO);
        prop_assert!(totals.total_amount >= totals.subtotal + totals.tax_amount);
        prop_assert_eq!(totals.tax_amount.fract(), Decimal::ZERO);
    }

    #[test]
    fn parallel_lanes_never_cost_more_than_separate_runs(
        base in 1_000u32..2_000_000,
        count in 1u32..12,
    ) {
        let base = Decimal::from(base);
        let discounted = parallel_discount(base, count);
        prop_assert!(discounted <= base * Decimal::from(count));
        prop_assert!(discounted >= base);
        prop_assert!(parallel_discount_multiplier(count + 1) > parallel_discount_multiplier(count));
    }

    #[test]
    fn quotes_respect_the_price_floor(
        bag_type in bag_type_strategy(),
        width in 50u32..400,
        height in 50u32..400,
        quantity in 100u32..=100_000,
    ) {
        let service = PricingService::new(PricingConfig::default());
        let request = QuoteRequest::new(
            bag_type,
            "PET",
            Decimal::from(width),
            Decimal::from(height),
            quantity,
        );
        let quote = service.calculate_quote(&request).unwrap();
        prop_assert!(quote.total_price >= MINIMUM_PRICE);
        prop_assert!(quote.unit_price > Decimal::ZERO);
        prop_assert_eq!(quote.quantity, quantity);
    }

    #[test]
    fn quantities_below_the_minimum_are_rejected(quantity in 1u32..100) {
        let service = PricingService::new(PricingConfig::default());
        let request = QuoteRequest::new("flat_3_side", "PET", dec!(100), dec!(150), quantity);
        prop_assert!(service.calculate_quote(&request).is_err());
    }

    #[test]
    fn tracking_separators_are_ignored(groups in prop::collection::vec("[0-9]{4}", 3)) {
        let dashed = groups.join("-");
        let spaced = groups.join(" ");
        let bare = groups.concat();
        prop_assert_eq!(clean_tracking_number(&dashed), bare.clone());
        prop_assert_eq!(clean_tracking_number(&spaced), bare.clone());
        prop_assert!(Carrier::Yamato.validate_tracking_number(&dashed));
        prop_assert!(!Carrier::Sagawa.validate_tracking_number(&dashed));
    }

    #[test]
    fn order_transitions_only_move_forward(from in status_strategy(), to in status_strategy()) {
        if from.can_transition_to(to) && to != OrderStatus::Cancelled {
            let from_step = from.step().unwrap();
            let to_step = to.step().unwrap();
            prop_assert_eq!(to_step, from_step + 1);
            prop_assert!(to.progress_percent() > from.progress_percent());
        }
        if from.is_terminal() {
            prop_assert!(from.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn status_parsing_ignores_case(status in status_strategy()) {
        let lower = status.to_string().to_lowercase();
        prop_assert_eq!(OrderStatus::parse(&lower), Some(status));
    }
}

#[test]
fn the_sequence_ends_at_delivered() {
    assert_eq!(ORDER_SEQUENCE.first(), Some(&OrderStatus::Pending));
    assert_eq!(ORDER_SEQUENCE.last(), Some(&OrderStatus::Delivered));
    assert_eq!(OrderStatus::Delivered.next(), None);
}

#[test]
fn production_stages_walk_forward_and_back() {
    let mut stage = ProductionStage::Design;
    let mut visited = vec![stage];
    while let Some(next) = stage.next() {
        assert_eq!(next.previous(), Some(stage));
        stage = next;
        visited.push(stage);
    }
    assert_eq!(visited.len(), 9);
    assert!(stage.is_last());
}
