use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qrpng::{encode_png, encode_symbol, generate, ErrorLevel, OutputTarget, QrOptions};

fn memory() -> QrOptions {
    QrOptions::default().with_target(OutputTarget::Memory)
}

fn bench_encode_symbol_small(c: &mut Criterion) {
    let options = memory();
    c.bench_function("encode_symbol_hello_world", |b| {
        b.iter(|| encode_symbol(black_box("HELLO WORLD"), &options))
    });
}

fn bench_encode_symbol_v40(c: &mut Criterion) {
    let text = "a".repeat(2953);
    let options = memory().with_level(ErrorLevel::Low);
    c.bench_function("encode_symbol_v40_low", |b| {
        b.iter(|| encode_symbol(black_box(&text), &options))
    });
}

fn bench_encode_png_scaled(c: &mut Criterion) {
    let options = memory().with_scale(8);
    let qr = encode_symbol("https://example.com/some/longer/path?query=1", &options).unwrap();
    c.bench_function("encode_png_scale_8", |b| b.iter(|| encode_png(black_box(&qr), &options)));
}

fn bench_generate(c: &mut Criterion) {
    let options = memory().with_scale(4);
    c.bench_function("generate_url_scale_4", |b| {
        b.iter(|| generate(black_box("https://example.com"), &options))
    });
}

criterion_group!(
    benches,
    bench_encode_symbol_small,
    bench_encode_symbol_v40,
    bench_encode_png_scaled,
    bench_generate
);
criterion_main!(benches);
