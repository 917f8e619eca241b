use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use licensedesk_core::{LicenseId, OwnerId};
use licensedesk_licensing::{
    License, LicenseCollection, LicenseKey, generate_key, is_valid_key_format,
};

fn bench_generate_key(c: &mut Criterion) {
    c.bench_function("generate_key", |b| b.iter(|| black_box(generate_key())));
}

fn bench_validate_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_valid_key_format");
    for (name, input) in [
        ("valid", "LICENSE-abcDEF12-0042"),
        ("bad_prefix", "LICENCE-abcDEF12-0042"),
        ("bad_suffix", "LICENSE-abcDEF12-00x2"),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, s| {
            b.iter(|| black_box(is_valid_key_format(black_box(s))))
        });
    }
    group.finish();
}

fn bench_verify_key(c: &mut Criterion) {
    let owner = OwnerId::new("bench-owner").unwrap();
    let now = Utc::now();

    let mut group = c.benchmark_group("verify_key");
    for size in [10usize, 100, 1_000] {
        let mut collection = LicenseCollection::empty(owner.clone());
        let mut last: Option<LicenseKey> = None;
        for _ in 0..size {
            let key = generate_key();
            last = Some(key.clone());
            let license = License::issue(LicenseId::new(), key, owner.clone(), now, 365).unwrap();
            collection.insert(license).unwrap();
        }
        let probe = last.unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &probe, |b, key| {
            b.iter(|| black_box(collection.verify_key(key.as_str(), now)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate_key, bench_validate_key, bench_verify_key);
criterion_main!(benches);
