// Signing & verification benchmarks.
//
// Covers Ed25519 key generation, single-message signing and verification,
// transaction signing, and batch verification at various sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use blocker_protocol::crypto::keys::PrivateKey;
use blocker_protocol::crypto::signatures::{sign, verify, verify_all};
use blocker_protocol::transaction::{sign_transaction, verify_transaction, TransactionBuilder};

fn bench_key_generation(c: &mut Criterion) {
    c.bench_function("ed25519/key_generate", |b| {
        b.iter(PrivateKey::generate);
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let key = PrivateKey::generate();
    let message = b"spend 500 from alice to bob";

    c.bench_function("ed25519/sign_message", |b| {
        b.iter(|| sign(&key, message));
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let key = PrivateKey::generate();
    let message = b"spend 500 from alice to bob";
    let signature = sign(&key, message);
    let public_key = key.public_key();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| verify(&signature, message, &public_key));
    });
}

fn bench_transaction(c: &mut Criterion) {
    let key = PrivateKey::generate();
    let to = PrivateKey::generate().public_key().address();
    let unsigned = TransactionBuilder::new()
        .input([7u8; 32], 0, key.public_key())
        .input([8u8; 32], 1, key.public_key())
        .output(900, to)
        .output(100, key.public_key().address())
        .build();

    c.bench_function("tx/sign_two_inputs", |b| {
        b.iter(|| {
            let mut tx = unsigned.clone();
            sign_transaction(&mut tx, &key);
            tx
        });
    });

    let mut signed = unsigned.clone();
    sign_transaction(&mut signed, &key);
    c.bench_function("tx/verify_two_inputs", |b| {
        b.iter(|| verify_transaction(&signed).unwrap());
    });
}

fn bench_batch_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("ed25519/verify_all");

    for size in [10, 50, 100, 500] {
        let items: Vec<_> = (0..size)
            .map(|i| {
                let key = PrivateKey::generate();
                let msg = format!("tx-{:06}", i).into_bytes();
                let sig = sign(&key, &msg);
                (sig, msg, key.public_key())
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| {
                assert!(verify_all(
                    items
                        .iter()
                        .map(|(sig, msg, pk)| (sig, msg.as_slice(), pk))
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_sign_message,
    bench_verify_signature,
    bench_transaction,
    bench_batch_verify,
);
criterion_main!(benches);
