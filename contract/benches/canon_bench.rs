//! Benchmarks for the canonical codec and digest — the hot path every
//! signed request and every state digest goes through.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use xvault_contract::canon::{canonical_bytes, digest_value};

fn payload() -> serde_json::Value {
    json!({
        "vaultId": "e2c215844c2539582f4c7979bac0b3b4217971ae86c07a8fb59af6640871b04b",
        "actor": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
        "encryptedBlob": "c2VjcmV0LWNpcGhlcnRleHQ=",
        "cid": "bafybeigdyrztf4f6xsl54n4xq4m5gxezm5q4za2ojx6x7lf5y3w4f4xhqy",
        "entryMetadata": {"service": "github", "username": "mike", "notes": null},
        "wrappedKeys": [
            {"address": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", "encryptedKey": "aGVsbG8="},
        ],
    })
}

fn bench_canonical_bytes(c: &mut Criterion) {
    let value = payload();
    c.bench_function("canonical_bytes/add_entry_preimage", |b| {
        b.iter(|| canonical_bytes(black_box(&value)).unwrap())
    });
}

fn bench_digest(c: &mut Criterion) {
    let value = payload();
    c.bench_function("digest_value/add_entry_preimage", |b| {
        b.iter(|| digest_value(black_box(&value)).unwrap())
    });
}

criterion_group!(benches, bench_canonical_bytes, bench_digest);
criterion_main!(benches);
