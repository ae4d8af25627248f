use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jma_forecast::{normalize, ForecastStore, RawForecastDocument, RegionCode};

const FORECAST_FIXTURE: &str = include_str!("../data/fixtures/forecast_130000.json");

fn bench_normalizer(c: &mut Criterion) {
    let document = RawForecastDocument::new(serde_json::from_str(FORECAST_FIXTURE).unwrap());
    let region = RegionCode::from("130000");

    c.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box(&region), black_box(&document)))
    });

    let records = normalize(&region, &document).unwrap();
    let store = ForecastStore::open_in_memory().unwrap();
    store.rebuild_schema().unwrap();
    c.bench_function("persist_region", |b| {
        b.iter(|| store.persist_region(black_box(&records)))
    });
}

criterion_group!(benches, bench_normalizer);
criterion_main!(benches);
