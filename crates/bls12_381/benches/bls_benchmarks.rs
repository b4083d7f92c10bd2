//! Performance benchmarks for BLS12-381 proof-of-possession operations
//!
//! Verification is dominated by hashing to G2 and the two-pair pairing check;
//! these benchmarks track both separately from the end-to-end operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use popsig_bls12_381::constants::POP_SIGNATURE_DST;
use popsig_bls12_381::hash_to_curve::expand_message_xmd;
use popsig_bls12_381::{hash_to_point, Bls12381, Signature};

/// Benchmark key derivation
fn bench_key_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("bls_key_operations");

    group.bench_function("key_gen", |b| {
        b.iter(|| black_box(Bls12381::key_gen(b"some-secret").unwrap()))
    });

    let secret_key = Bls12381::key_gen(b"some-secret").unwrap();
    group.bench_function("sk_to_pk", |b| {
        b.iter(|| black_box(Bls12381::derive_public_key(&secret_key)))
    });

    let pk_bytes = Bls12381::derive_public_key(&secret_key).to_bytes();
    group.bench_function("key_validate", |b| {
        b.iter(|| black_box(Bls12381::key_validate(&pk_bytes)))
    });

    group.finish();
}

/// Benchmark hash-to-curve stages
fn bench_hash_to_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("bls_hash_to_curve");
    let dst = POP_SIGNATURE_DST.as_bytes();

    group.bench_function("expand_message_xmd_256", |b| {
        b.iter(|| black_box(expand_message_xmd(b"benchmark", dst, 256).unwrap()))
    });

    for size in [32usize, 256, 4096] {
        let message = vec![0x42u8; size];
        group.bench_with_input(BenchmarkId::new("hash_to_point", size), &size, |b, _| {
            b.iter(|| black_box(hash_to_point(&message, dst).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark signing and verification
fn bench_sign_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("bls_sign_verify");

    let secret_key = Bls12381::key_gen(b"some-secret").unwrap();
    let public_key = Bls12381::derive_public_key(&secret_key);
    let message = [0x3au8; 32];
    let signature = Bls12381::sign(&secret_key, &message).unwrap();
    let pk_bytes = public_key.to_bytes();
    let sig_bytes = signature.to_bytes();

    group.bench_function("sign", |b| {
        b.iter(|| black_box(Bls12381::sign(&secret_key, &message).unwrap()))
    });

    group.bench_function("verify", |b| {
        b.iter(|| black_box(Bls12381::verify(&public_key, &message, &signature)))
    });

    group.bench_function("verify_bytes", |b| {
        b.iter(|| black_box(Bls12381::verify_bytes(&pk_bytes, &message, &sig_bytes).unwrap()))
    });

    group.bench_function("signature_from_bytes", |b| {
        b.iter(|| black_box(Signature::from_bytes(&sig_bytes).unwrap()))
    });

    let proof = Bls12381::pop_prove(&secret_key).unwrap();
    group.bench_function("pop_verify", |b| {
        b.iter(|| black_box(Bls12381::pop_verify(&public_key, &proof)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_key_operations,
    bench_hash_to_curve,
    bench_sign_verify
);

criterion_main!(benches);
