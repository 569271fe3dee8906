use criterion::{criterion_group, criterion_main, Criterion};
use qepipe::{translate, PassthroughTranspiler, StaticCatalog, TranslatorConfig};

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(path).unwrap()
}

fn bench_translate(c: &mut Criterion) {
    let catalog = StaticCatalog::from_yaml(&fixture("catalog.yaml")).unwrap();
    let config = TranslatorConfig::default();
    for name in ["self_join.json", "top_supplier.json"] {
        let explain = fixture(name);
        c.bench_function(&format!("translate/{}", name), |b| {
            b.iter(|| {
                let _ = translate(&explain, &catalog, &PassthroughTranspiler, &config).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
