use chrono::{Duration as ChronoDuration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use epack_api::{
    config::PricingConfig,
    services::pricing::{
        film::{self, FilmCostInput},
        materials::FilmLayer,
        pouch::{self, PouchDimensions, SkuCostInput},
        unified::{self, QuoteRequest},
        CostRates, PricingService,
    },
};
use rust_decimal_macros::dec;
use std::time::Duration;

// Uncached unified quote across lot sizes
fn unified_quote_benchmark(c: &mut Criterion) {
    let rates = CostRates::default();
    let valid_until = Utc::now() + ChronoDuration::days(30);
    let mut group = c.benchmark_group("unified_quote");

    for quantity in [500u32, 5_000, 50_000].iter() {
        let request = QuoteRequest::new("stand_up", "PET", dec!(130), dec!(200), *quantity);
        group.bench_with_input(
            BenchmarkId::from_parameter(quantity),
            &request,
            |b, request| {
                b.iter(|| unified::calculate_quote(black_box(request), &rates, valid_until));
            },
        );
    }

    group.finish();
}

// Repeated identical requests served from the quote cache
fn cached_quote_benchmark(c: &mut Criterion) {
    let service = PricingService::new(PricingConfig::default());
    let request = QuoteRequest::new("flat_3_side", "PET", dec!(100), dec!(150), 1_000);
    let _ = service.calculate_quote(&request);

    c.bench_function("cached_quote", |b| {
        b.iter(|| service.calculate_quote(black_box(&request)));
    });
}

fn film_cost_benchmark(c: &mut Criterion) {
    let rates = CostRates::default();
    let mut input = FilmCostInput::new(
        vec![
            FilmLayer::new("PET", 12),
            FilmLayer::new("AL", 7),
            FilmLayer::new("LLDPE", 60),
        ],
        dec!(2000),
    );
    input.width = dec!(760);

    c.bench_function("film_cost_three_layers", |b| {
        b.iter(|| film::calculate_film_cost(black_box(&input), &rates));
    });
}

fn sku_cost_benchmark(c: &mut Criterion) {
    let rates = CostRates::default();
    let mut group = c.benchmark_group("sku_cost");

    for skus in [1usize, 4, 10].iter() {
        let input = SkuCostInput {
            sku_quantities: vec![1_000; *skus],
            dimensions: PouchDimensions::new(dec!(130), dec!(200), dec!(40)),
            pouch_type: "stand_up".to_string(),
            material_id: Some("PET".to_string()),
            thickness_selection: None,
            film_layers: None,
            post_processing_options: Vec::new(),
            material_width: None,
        };
        group.bench_with_input(BenchmarkId::from_parameter(skus), &input, |b, input| {
            b.iter(|| pouch::calculate_sku_cost(black_box(input), &rates));
        });
    }

    group.finish();
}

fn quantity_comparison_benchmark(c: &mut Criterion) {
    let service = PricingService::new(PricingConfig::default());
    let base = QuoteRequest::new("stand_up", "PET", dec!(130), dec!(200), 1_000);
    let quantities = [500u32, 1_000, 3_000, 5_000, 10_000, 30_000];

    c.bench_function("compare_six_quantities", |b| {
        b.iter(|| {
            service.clear_cache();
            service.compare_quantities(black_box(&base), &quantities)
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        unified_quote_benchmark,
        cached_quote_benchmark,
        film_cost_benchmark,
        sku_cost_benchmark,
        quantity_comparison_benchmark
}

criterion_main!(benches);
