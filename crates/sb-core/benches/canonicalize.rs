use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sb_core::{candidate_forms, canonicalize, fingerprint};

const URLS: [&str; 4] = [
    "http://www.example.com/",
    "HTTP://www.Example.com/a/./b/../c",
    "http://a.b.c.d.e.f.g/1/2/3/4.html?param=1&other=%2520",
    "http://%31%36%38.%31%38%38.%39%39.%32%36/%2E%73%65%63%75%72%65/www.example.com/",
];

fn bench_canonicalize(c: &mut Criterion) {
    c.bench_function("canonicalize", |b| {
        b.iter(|| {
            for url in URLS {
                let _ = canonicalize(black_box(url));
            }
        })
    });
}

fn bench_full_lookup_keys(c: &mut Criterion) {
    c.bench_function("canonicalize_forms_fingerprint", |b| {
        b.iter(|| {
            for url in URLS {
                if let Ok(canonical) = canonicalize(black_box(url)) {
                    for form in candidate_forms(&canonical) {
                        black_box(fingerprint(&form));
                    }
                }
            }
        })
    });
}

criterion_group!(benches, bench_canonicalize, bench_full_lookup_keys);
criterion_main!(benches);
