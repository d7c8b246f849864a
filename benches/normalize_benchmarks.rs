//! Benchmarks for the request hot path: validation, normalization and signing.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use video_token_service::{
    api::validate_token_request,
    issuer::{JwtSigner, TokenSigner},
    normalize,
};

fn bench_normalize(c: &mut Criterion) {
    let inputs = [
        ("short", "bob".to_string()),
        ("display_name", "Alice Johnson!".to_string()),
        ("unicode", "Zoë Ünïcödé 名前".to_string()),
        ("max_len", "A".repeat(64)),
        ("too_long", "x".repeat(500)),
    ];

    let mut group = c.benchmark_group("normalize");
    for (name, input) in &inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| black_box(normalize(black_box(input))));
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let body = json!({"userId": "Bob Smith"});
    c.bench_function("validate_token_request", |b| {
        b.iter(|| black_box(validate_token_request(black_box(&body))));
    });
}

fn bench_sign(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let signer = JwtSigner::new();
    let identity = normalize("bob_smith").unwrap();

    c.bench_function("jwt_sign", |b| {
        b.iter(|| {
            runtime
                .block_on(signer.sign(black_box("benchmark-secret"), &identity))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_normalize, bench_validate, bench_sign);
criterion_main!(benches);
