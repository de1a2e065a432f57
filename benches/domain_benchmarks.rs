use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use peer_transfer_client::app::{accepts_amount_input, mask_account_number, reconcile};
use peer_transfer_client::domain::{Account, SubmitTransferRequest, Transaction};
use rust_decimal::Decimal;
use std::hint::black_box;
use validator::Validate;

const ACCOUNT: i64 = 7;

fn legs(count: i64) -> (Vec<Transaction>, Vec<Transaction>) {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let tx = |id: i64, src: i64, dst: i64| Transaction {
        id,
        amount: Decimal::new(1250 + id, 2),
        timestamp: start + Duration::minutes((id * 37) % 1440),
        source_account: Account::new(src, format!("{:016}", src), Decimal::ZERO),
        destination_account: Account::new(dst, format!("{:016}", dst), Decimal::ZERO),
        commission: Vec::new(),
    };
    let outgoing = (0..count).map(|i| tx(i, ACCOUNT, 100 + i)).collect();
    let incoming = (count..2 * count).map(|i| tx(i, 100 + i, ACCOUNT)).collect();
    (outgoing, incoming)
}

fn bench_reconcile(c: &mut Criterion) {
    let (outgoing, incoming) = legs(500);

    c.bench_function("reconcile_1000_transactions", |b| {
        b.iter(|| reconcile(ACCOUNT, black_box(outgoing.clone()), black_box(incoming.clone())))
    });
}

fn bench_amount_input(c: &mut Criterion) {
    let inputs = ["", "5", "150.00", ".5", "50.001", "abc", "1.2.3"];

    c.bench_function("accepts_amount_input", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(accepts_amount_input(black_box(input)));
            }
        })
    });

    let request = SubmitTransferRequest::new(10, 30, Decimal::new(5025, 2));
    c.bench_function("validate_transfer_request", |b| {
        b.iter(|| {
            let _ = black_box(&request).validate();
        })
    });
}

fn bench_masking(c: &mut Criterion) {
    c.bench_function("mask_account_number", |b| {
        b.iter(|| mask_account_number(black_box("1234567890123456")))
    });
}

criterion_group!(benches, bench_reconcile, bench_amount_input, bench_masking);
criterion_main!(benches);
